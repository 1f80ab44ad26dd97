// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Flow Data Models
//!
//! Values exchanged between the wallet, the flows and the backend.
//!
//! ## Model Categories
//!
//! - **Identity**: [`AccountHandle`], [`Challenge`], [`SignedChallenge`], [`Session`]
//! - **Purchase**: [`PurchaseIntent`], [`OnChainReceipt`], [`PurchaseRecord`]
//!
//! An [`AccountHandle`] is a reference into wallet-managed state. It is
//! re-resolved through the wallet on every flow and never persisted as a
//! trust anchor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::{payable_amount, AmountError, Mutez};

// =============================================================================
// Identifier Types
// =============================================================================

/// Public address of the account the wallet signs with (`tz1...`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AccountHandle(pub String);

impl AccountHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountHandle {
    fn from(value: &str) -> Self {
        AccountHandle(value.to_string())
    }
}

impl From<String> for AccountHandle {
    fn from(value: String) -> Self {
        AccountHandle(value)
    }
}

/// Hash of an injected operation (`o...`). Key of every purchase record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OperationHash(pub String);

impl OperationHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OperationHash {
    fn from(value: &str) -> Self {
        OperationHash(value.to_string())
    }
}

impl From<String> for OperationHash {
    fn from(value: String) -> Self {
        OperationHash(value)
    }
}

// =============================================================================
// Identity Models
// =============================================================================

/// One-time login statement and its signable encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// `I want to login on {site} at {issued_at}`.
    pub statement: String,
    pub issued_at: DateTime<Utc>,
    /// Hex-encoded Micheline string packing of `statement`.
    pub payload_bytes: String,
}

/// A challenge signed by the wallet, consumed once by the login request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedChallenge {
    pub challenge: Challenge,
    pub signer_address: AccountHandle,
    pub signature: String,
}

/// Public profile returned by the backend alongside the session token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Any other profile fields the backend sends, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Authenticated session, persisted as `{ token, ...profile }`.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    #[serde(flatten)]
    pub profile: ProfileSummary,
}

impl Session {
    pub fn new(token: impl Into<String>, profile: ProfileSummary) -> Self {
        Self {
            token: token.into(),
            profile,
        }
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }
}

// Token stays out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

// =============================================================================
// Purchase Models
// =============================================================================

/// A buyer's request to purchase shares of a project.
///
/// Immutable once handed to the purchase orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    pub project_id: u64,
    /// Price of one share.
    pub share_price: Mutez,
    pub num_shares: u32,
    /// Platform fee in percent.
    pub fee_pct: u16,
}

impl PurchaseIntent {
    pub fn new(project_id: u64, share_price: Mutez, num_shares: u32, fee_pct: u16) -> Self {
        Self {
            project_id,
            share_price,
            num_shares,
            fee_pct,
        }
    }

    /// Amount to attach to the transfer, fee included, rounded down.
    pub fn payable_amount(&self) -> Result<Mutez, AmountError> {
        payable_amount(self.num_shares, self.share_price, self.fee_pct)
    }
}

/// Proof that a submitted operation was included on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainReceipt {
    pub operation_hash: OperationHash,
    pub block_hash: String,
    pub confirmations: u32,
}

/// The backend's durable record of a confirmed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub operation_hash: OperationHash,
    pub project_id: u64,
    /// Shares credited by the backend, as read from the chain.
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub purchased_on: Option<DateTime<Utc>>,
    /// Username of the buyer as known to the backend.
    #[serde(default)]
    pub patron: Option<String>,
}
