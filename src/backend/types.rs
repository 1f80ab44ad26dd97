// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request and response bodies of the storefront REST API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{OnChainReceipt, OperationHash, PurchaseRecord};

/// Key the backend uses for errors not tied to a field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Body of `POST login-by-wallet`.
#[derive(Debug, Serialize)]
pub struct WalletLoginRequest<'a> {
    pub wallet: &'a str,
    /// The signed payload bytes (hex), not the plain statement.
    pub message: &'a str,
    pub signature: &'a str,
}

/// Body of `POST projects/{id}/buy`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuySharesRequest<'a> {
    pub operation_hash: &'a str,
    pub block_hash: &'a str,
}

impl<'a> From<&'a OnChainReceipt> for BuySharesRequest<'a> {
    fn from(receipt: &'a OnChainReceipt) -> Self {
        Self {
            operation_hash: receipt.operation_hash.as_str(),
            block_hash: &receipt.block_hash,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PatronSummary {
    pub username: String,
}

/// Share created (or found) by the buy endpoint.
#[derive(Debug, Deserialize)]
pub struct ShareResponse {
    #[serde(default)]
    pub patron: Option<PatronSummary>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub purchased_on: Option<DateTime<Utc>>,
}

impl ShareResponse {
    pub fn into_record(self, project_id: u64, operation_hash: OperationHash) -> PurchaseRecord {
        PurchaseRecord {
            operation_hash,
            project_id,
            quantity: self.quantity,
            purchased_on: self.purchased_on,
            patron: self.patron.map(|p| p.username),
        }
    }
}

/// Validation errors keyed by field, as returned with 4xx responses.
///
/// Both `{ "non_field_errors": [..] }` and `{ "field": [..] }` shapes are
/// accepted. Bodies that are not a JSON object are kept under `detail`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn from_body(body: &str) -> Self {
        let mut errors = BTreeMap::new();

        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => {
                for (field, value) in map {
                    let messages = match value {
                        serde_json::Value::Array(items) => {
                            items.into_iter().map(value_to_message).collect()
                        }
                        other => vec![value_to_message(other)],
                    };
                    errors.insert(field, messages);
                }
            }
            _ => {
                let body = body.trim();
                if !body.is_empty() {
                    errors.insert("detail".to_string(), vec![body.to_string()]);
                }
            }
        }

        Self(errors)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// The message to show the user: the first non-field error, then
    /// `detail`, then the first field error prefixed with its field.
    pub fn first_message(&self) -> Option<String> {
        for key in [NON_FIELD_ERRORS, "detail"] {
            if let Some(message) = self.0.get(key).and_then(|m| m.first()) {
                return Some(message.clone());
            }
        }

        self.0
            .iter()
            .find_map(|(field, messages)| messages.first().map(|m| format!("{field}: {m}")))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.first_message() {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "no details"),
        }
    }
}

fn value_to_message(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
