// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet protocol consumed by the login and purchase flows.
//!
//! The wallet runs out of process (browser extension, mobile app, remote
//! signer). This module only describes the requests the flows make and
//! the answers they expect:
//!
//! | Request | Answer |
//! |---------|--------|
//! | `get_active_account` | previously granted account, no prompt |
//! | `request_permissions` | account granted for a network, prompts |
//! | `request_sign_payload` | signature over a Micheline payload, prompts |
//! | `transfer` | hash of the injected operation, prompts |
//! | `confirmation` | block that includes the operation |
//!
//! Every prompting call may stay pending until the user answers. A request
//! already handed to the wallet cannot be withdrawn.

pub mod connector;
pub mod error;

pub use connector::WalletConnector;
pub use error::WalletError;

use serde::{Deserialize, Serialize};

use crate::blockchain::{Mutez, Network, BUY_SHARES_ENTRYPOINT};
use crate::models::{AccountHandle, OperationHash};

/// How the wallet should interpret a payload to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningType {
    Raw,
    Operation,
    Micheline,
}

/// Permission request scoped to a network and shown under the dApp name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub app_name: String,
    pub network: Network,
}

/// Request to sign an arbitrary payload with a given account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPayloadRequest {
    pub signing_type: SigningType,
    /// Hex string.
    pub payload: String,
    pub source_address: AccountHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignPayloadResponse {
    pub signature: String,
}

/// Contract call with tez attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub source: AccountHandle,
    pub destination: String,
    pub entrypoint: String,
    /// Positional entrypoint arguments.
    pub arguments: Vec<serde_json::Value>,
    pub amount: Mutez,
}

impl ContractCall {
    /// `buy_shares(num_shares, project_id)` on the collecting contract.
    pub fn buy_shares(
        source: AccountHandle,
        contract: impl Into<String>,
        num_shares: u32,
        project_id: u64,
        amount: Mutez,
    ) -> Self {
        Self {
            source,
            destination: contract.into(),
            entrypoint: BUY_SHARES_ENTRYPOINT.to_string(),
            arguments: vec![num_shares.into(), project_id.into()],
            amount,
        }
    }
}

/// Block inclusion of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfirmation {
    pub block_hash: String,
    pub confirmations: u32,
}

/// Client side of the wallet protocol.
///
/// Implemented by wallet bridges. `WalletClient` is the `Send` variant the
/// flows require so settlement can continue on a spawned task.
#[trait_variant::make(WalletClient: Send)]
pub trait LocalWalletClient {
    /// Account already granted to this dApp, without prompting.
    async fn get_active_account(&self) -> Result<Option<AccountHandle>, WalletError>;

    /// Prompt the user for account access on `request.network`.
    async fn request_permissions(
        &self,
        request: &PermissionRequest,
    ) -> Result<AccountHandle, WalletError>;

    /// Prompt the user to sign `request.payload`.
    async fn request_sign_payload(
        &self,
        request: &SignPayloadRequest,
    ) -> Result<SignPayloadResponse, WalletError>;

    /// Prompt the user to confirm a contract call and inject it.
    async fn transfer(&self, call: &ContractCall) -> Result<OperationHash, WalletError>;

    /// Resolve once `op_hash` has at least `confirmations` confirmations.
    async fn confirmation(
        &self,
        op_hash: &OperationHash,
        confirmations: u32,
    ) -> Result<BlockConfirmation, WalletError>;
}
