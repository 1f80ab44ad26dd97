// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use chrono::TimeZone;
use tokio::sync::Notify;

use crate::models::{
    AccountHandle, Challenge, OperationHash, ProfileSummary, Session, SignedChallenge,
};
use crate::wallet::{
    BlockConfirmation, ContractCall, PermissionRequest, SignPayloadRequest, SignPayloadResponse,
    WalletClient, WalletError,
};

/// A session for `alice` with the given token.
pub fn sample_session(token: &str) -> Session {
    Session::new(
        token,
        ProfileSummary {
            username: "alice".to_string(),
            ..Default::default()
        },
    )
}

/// `tz1abc`'s signature `sig` over the 2024-01-01 ArtCrowd challenge.
pub fn signed_challenge() -> SignedChallenge {
    let issued_at = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    SignedChallenge {
        challenge: Challenge::issue("ArtCrowd", issued_at).unwrap(),
        signer_address: "tz1abc".into(),
        signature: "sig".to_string(),
    }
}

#[derive(Default)]
struct Calls {
    permission_requests: Vec<PermissionRequest>,
    sign_requests: Vec<SignPayloadRequest>,
    transfers: Vec<ContractCall>,
    confirmations: Vec<(OperationHash, u32)>,
}

/// In-memory wallet answering from a script and recording every request.
pub struct ScriptedWallet {
    active_account: Result<Option<AccountHandle>, WalletError>,
    permission: Result<AccountHandle, WalletError>,
    signature: Result<String, WalletError>,
    transfer: Result<OperationHash, WalletError>,
    confirmation: Result<BlockConfirmation, WalletError>,
    transfer_gate: Option<Arc<Notify>>,
    confirmation_gate: Option<Arc<Notify>>,
    calls: Mutex<Calls>,
}

impl Default for ScriptedWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedWallet {
    /// No account granted; every prompt fails as unavailable; confirmations
    /// resolve in block `BLock`.
    pub fn new() -> Self {
        let unavailable = || WalletError::Unavailable("not scripted".to_string());
        Self {
            active_account: Ok(None),
            permission: Err(unavailable()),
            signature: Err(unavailable()),
            transfer: Err(unavailable()),
            confirmation: Ok(BlockConfirmation {
                block_hash: "BLock".to_string(),
                confirmations: 1,
            }),
            transfer_gate: None,
            confirmation_gate: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn with_active_account(mut self, address: &str) -> Self {
        self.active_account = Ok(Some(address.into()));
        self
    }

    pub fn with_active_account_error(mut self, error: WalletError) -> Self {
        self.active_account = Err(error);
        self
    }

    pub fn with_permission_grant(mut self, address: &str) -> Self {
        self.permission = Ok(address.into());
        self
    }

    pub fn with_permission_error(mut self, error: WalletError) -> Self {
        self.permission = Err(error);
        self
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Ok(signature.to_string());
        self
    }

    pub fn with_sign_error(mut self, error: WalletError) -> Self {
        self.signature = Err(error);
        self
    }

    pub fn with_operation(mut self, op_hash: &str) -> Self {
        self.transfer = Ok(op_hash.into());
        self
    }

    pub fn with_transfer_error(mut self, error: WalletError) -> Self {
        self.transfer = Err(error);
        self
    }

    pub fn with_block(mut self, block_hash: &str) -> Self {
        self.confirmation = Ok(BlockConfirmation {
            block_hash: block_hash.to_string(),
            confirmations: 1,
        });
        self
    }

    pub fn with_confirmation_error(mut self, error: WalletError) -> Self {
        self.confirmation = Err(error);
        self
    }

    /// Hold every transfer prompt open until `gate` is notified. The call is
    /// recorded before it blocks.
    pub fn with_transfer_gate(mut self, gate: Arc<Notify>) -> Self {
        self.transfer_gate = Some(gate);
        self
    }

    /// Hold every confirmation until `gate` is notified.
    pub fn with_confirmation_gate(mut self, gate: Arc<Notify>) -> Self {
        self.confirmation_gate = Some(gate);
        self
    }

    pub fn permission_requests(&self) -> Vec<PermissionRequest> {
        self.calls.lock().unwrap().permission_requests.clone()
    }

    pub fn sign_requests(&self) -> Vec<SignPayloadRequest> {
        self.calls.lock().unwrap().sign_requests.clone()
    }

    pub fn transfers(&self) -> Vec<ContractCall> {
        self.calls.lock().unwrap().transfers.clone()
    }

    pub fn confirmation_requests(&self) -> Vec<(OperationHash, u32)> {
        self.calls.lock().unwrap().confirmations.clone()
    }
}

impl WalletClient for ScriptedWallet {
    async fn get_active_account(&self) -> Result<Option<AccountHandle>, WalletError> {
        self.active_account.clone()
    }

    async fn request_permissions(
        &self,
        request: &PermissionRequest,
    ) -> Result<AccountHandle, WalletError> {
        self.calls
            .lock()
            .unwrap()
            .permission_requests
            .push(request.clone());
        self.permission.clone()
    }

    async fn request_sign_payload(
        &self,
        request: &SignPayloadRequest,
    ) -> Result<SignPayloadResponse, WalletError> {
        self.calls.lock().unwrap().sign_requests.push(request.clone());
        self.signature
            .clone()
            .map(|signature| SignPayloadResponse { signature })
    }

    async fn transfer(&self, call: &ContractCall) -> Result<OperationHash, WalletError> {
        self.calls.lock().unwrap().transfers.push(call.clone());

        if let Some(gate) = &self.transfer_gate {
            gate.notified().await;
        }
        self.transfer.clone()
    }

    async fn confirmation(
        &self,
        op_hash: &OperationHash,
        confirmations: u32,
    ) -> Result<BlockConfirmation, WalletError> {
        self.calls
            .lock()
            .unwrap()
            .confirmations
            .push((op_hash.clone(), confirmations));

        if let Some(gate) = &self.confirmation_gate {
            gate.notified().await;
        }
        self.confirmation.clone()
    }
}
