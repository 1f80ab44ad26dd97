// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Share purchase state machine.
//!
//! ```text
//! Idle → Submitting → AwaitingConfirmation → Reconciling → Completed
//!            │                 │                  ├→ PartialFailure (401)
//!            └→ Rejected       └→ Failed          └→ Failed
//! ```
//!
//! Once the transfer prompt is open the payment is out of our hands. The
//! purchase therefore runs on its own task from `Submitting` on: dropping
//! the caller's future does not stop the transfer, the journaling of its
//! hash or the settlement (confirmation wait plus recording). A settlement
//! that failed is continued with [`PurchaseOrchestrator::resume`], which
//! never pays again.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::{PurchaseError, Reconciler};
use crate::blockchain::format_tez;
use crate::models::{OnChainReceipt, OperationHash, PurchaseIntent, PurchaseRecord};
use crate::storage::{AuditEvent, AuditEventType, AuditLog, JournalStatus, ReceiptJournal};
use crate::wallet::{ContractCall, WalletClient, WalletConnector};

/// Purchase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Reconciling,
    Completed,
    PartialFailure,
    Rejected,
    Failed,
}

impl PurchaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseState::Completed
                | PurchaseState::PartialFailure
                | PurchaseState::Rejected
                | PurchaseState::Failed
        )
    }
}

pub struct PurchaseOrchestrator<W> {
    connector: WalletConnector<W>,
    reconciler: Arc<Reconciler>,
    journal: Arc<ReceiptJournal>,
    audit: AuditLog,
    contract: String,
    confirmations: u32,
}

impl<W> Clone for PurchaseOrchestrator<W> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            reconciler: Arc::clone(&self.reconciler),
            journal: Arc::clone(&self.journal),
            audit: self.audit.clone(),
            contract: self.contract.clone(),
            confirmations: self.confirmations,
        }
    }
}

impl<W> PurchaseOrchestrator<W>
where
    W: WalletClient + Send + Sync + 'static,
{
    /// `contract` is the collecting contract; `confirmations` the depth
    /// awaited before recording (at least 1).
    pub fn new(
        connector: WalletConnector<W>,
        reconciler: Arc<Reconciler>,
        contract: impl Into<String>,
        confirmations: u32,
    ) -> Self {
        Self {
            connector,
            journal: Arc::clone(reconciler.journal()),
            reconciler,
            audit: AuditLog::disabled(),
            contract: contract.into(),
            confirmations: confirmations.max(1),
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    /// Buy shares and wait for the backend record.
    pub async fn buy(&self, intent: PurchaseIntent) -> Result<PurchaseRecord, PurchaseError> {
        let (progress, _) = watch::channel(PurchaseState::Idle);
        self.buy_observed(intent, progress).await
    }

    /// Buy shares, publishing every state on `progress`.
    ///
    /// The whole purchase runs on its own task and `progress` moves into it.
    /// Dropping this future once the wallet prompt is open does not cancel
    /// the transfer: a hash the wallet returns later is still journaled and
    /// settled.
    pub async fn buy_observed(
        &self,
        intent: PurchaseIntent,
        progress: watch::Sender<PurchaseState>,
    ) -> Result<PurchaseRecord, PurchaseError> {
        let this = self.clone();
        let project_id = intent.project_id;
        let purchase = tokio::spawn(async move {
            let result = this.run(&intent, &progress).await;
            progress.send_replace(match &result {
                Ok(_) => PurchaseState::Completed,
                Err(e) => e.terminal_state(),
            });
            result
        });

        purchase.await.map_err(|e| {
            error!(project_id, error = %e, "Purchase task did not finish");
            PurchaseError::Interrupted {
                project_id,
                reason: e.to_string(),
            }
        })?
    }

    async fn run(
        &self,
        intent: &PurchaseIntent,
        progress: &watch::Sender<PurchaseState>,
    ) -> Result<PurchaseRecord, PurchaseError> {
        progress.send_replace(PurchaseState::Submitting);

        let op_hash = self.submit(intent).await.inspect_err(|e| {
            warn!(
                project_id = intent.project_id,
                error = %e,
                error_code = e.error_code(),
                "Purchase not submitted"
            );
        })?;

        self.settle(intent.project_id, &op_hash, progress).await
    }

    /// Continue a journaled purchase from its last durable phase.
    ///
    /// Never calls the wallet's transfer.
    pub async fn resume(&self, op_hash: &OperationHash) -> Result<PurchaseRecord, PurchaseError> {
        let entry = self
            .journal
            .get(op_hash)
            .map_err(|e| PurchaseError::Journal(e.to_string()))?
            .ok_or_else(|| PurchaseError::UnknownOperation(op_hash.clone()))?;

        info!(op_hash = %op_hash, status = ?entry.status, "Resuming purchase");

        if let (JournalStatus::Recorded, Some(record)) = (entry.status, &entry.record) {
            return Ok(record.clone());
        }

        match entry.receipt() {
            Some(receipt) => self.reconciler.reconcile(entry.project_id, &receipt).await,
            None => {
                let (progress, _) = watch::channel(PurchaseState::AwaitingConfirmation);
                self.settle(entry.project_id, op_hash, &progress).await
            }
        }
    }

    // =========================================================================
    // Phases
    // =========================================================================

    /// Resolve the account and dispatch the payment.
    ///
    /// The returned hash is already journaled (when the journal is writable).
    pub async fn submit(&self, intent: &PurchaseIntent) -> Result<OperationHash, PurchaseError> {
        if intent.num_shares == 0 {
            return Err(PurchaseError::InvalidIntent(
                "at least one share is required".to_string(),
            ));
        }
        if intent.share_price.is_zero() {
            return Err(PurchaseError::InvalidIntent(
                "share price must be positive".to_string(),
            ));
        }
        let amount = intent
            .payable_amount()
            .map_err(|e| PurchaseError::InvalidIntent(e.to_string()))?;

        let account = self
            .connector
            .connect()
            .await
            .map_err(PurchaseError::WalletUnavailable)?;

        let call = ContractCall::buy_shares(
            account.clone(),
            self.contract.clone(),
            intent.num_shares,
            intent.project_id,
            amount,
        );
        info!(
            project_id = intent.project_id,
            num_shares = intent.num_shares,
            amount = %format_tez(amount),
            account = %account,
            "Submitting payment"
        );

        let op_hash = self.connector.wallet().transfer(&call).await.map_err(|e| {
            if e.is_declined() {
                PurchaseError::Declined
            } else {
                PurchaseError::SubmissionFailed(e)
            }
        })?;

        // Journal first: everything after this point must be resumable
        if let Err(e) = self
            .journal
            .record_submitted(&op_hash, intent, amount, &account)
        {
            error!(
                op_hash = %op_hash,
                project_id = intent.project_id,
                error = %e,
                "Failed to journal submitted payment"
            );
        }
        self.audit.record(
            AuditEvent::new(AuditEventType::PaymentSubmitted)
                .with_account(account.as_str())
                .with_operation(intent.project_id, &op_hash)
                .with_details(serde_json::json!({
                    "num_shares": intent.num_shares,
                    "amount": amount,
                })),
        );
        info!(op_hash = %op_hash, project_id = intent.project_id, "Payment submitted");

        Ok(op_hash)
    }

    /// Wait until `op_hash` is included with the configured depth.
    pub async fn await_confirmation(
        &self,
        op_hash: &OperationHash,
    ) -> Result<OnChainReceipt, PurchaseError> {
        let block = match self
            .connector
            .wallet()
            .confirmation(op_hash, self.confirmations)
            .await
        {
            Ok(block) => block,
            Err(e) => {
                error!(op_hash = %op_hash, error = %e, "Payment confirmation failed");
                if let Err(je) = self.journal.note_failure(op_hash, &e.to_string()) {
                    warn!(op_hash = %op_hash, error = %je, "Failed to journal confirmation failure");
                }
                return Err(PurchaseError::ConfirmationPending {
                    op_hash: op_hash.clone(),
                    error: e,
                });
            }
        };

        let receipt = OnChainReceipt {
            operation_hash: op_hash.clone(),
            block_hash: block.block_hash,
            confirmations: block.confirmations.max(self.confirmations),
        };

        match self.journal.mark_confirmed(&receipt) {
            Ok(entry) => self.audit.record(
                AuditEvent::new(AuditEventType::PaymentConfirmed)
                    .with_operation(entry.project_id, op_hash)
                    .with_details(serde_json::json!({ "block_hash": receipt.block_hash })),
            ),
            Err(e) => error!(
                op_hash = %op_hash,
                block_hash = %receipt.block_hash,
                error = %e,
                "Failed to journal confirmed payment"
            ),
        }
        info!(op_hash = %op_hash, block_hash = %receipt.block_hash, "Payment confirmed");

        Ok(receipt)
    }

    async fn settle(
        &self,
        project_id: u64,
        op_hash: &OperationHash,
        progress: &watch::Sender<PurchaseState>,
    ) -> Result<PurchaseRecord, PurchaseError> {
        progress.send_replace(PurchaseState::AwaitingConfirmation);
        let receipt = self.await_confirmation(op_hash).await?;

        progress.send_replace(PurchaseState::Reconciling);
        self.reconciler.reconcile(project_id, &receipt).await
    }
}
