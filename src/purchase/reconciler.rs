// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recording step of a purchase.
//!
//! Posting a receipt is the only step that may be repeated. The backend is
//! idempotent on the operation hash; a receipt already recorded in the
//! journal is answered locally without a call.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::PurchaseError;
use crate::backend::{BackendClient, BackendError};
use crate::models::{OnChainReceipt, PurchaseRecord};
use crate::storage::{AuditEvent, AuditEventType, AuditLog, ReceiptJournal};

pub struct Reconciler {
    backend: Arc<BackendClient>,
    journal: Arc<ReceiptJournal>,
    audit: AuditLog,
}

impl Reconciler {
    pub fn new(backend: Arc<BackendClient>, journal: Arc<ReceiptJournal>, audit: AuditLog) -> Self {
        Self {
            backend,
            journal,
            audit,
        }
    }

    pub fn journal(&self) -> &Arc<ReceiptJournal> {
        &self.journal
    }

    /// Record a confirmed payment with the backend.
    pub async fn reconcile(
        &self,
        project_id: u64,
        receipt: &OnChainReceipt,
    ) -> Result<PurchaseRecord, PurchaseError> {
        let op_hash = &receipt.operation_hash;

        match self.journal.get(op_hash) {
            Ok(Some(entry)) if entry.is_recorded() => {
                if let Some(record) = entry.record {
                    debug!(op_hash = %op_hash, "Receipt already recorded");
                    return Ok(record);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(op_hash = %op_hash, error = %e, "Receipt journal unreadable"),
        }

        match self.backend.buy_shares(project_id, receipt).await {
            Ok(record) => {
                if let Err(e) = self.journal.mark_recorded(receipt, &record) {
                    warn!(op_hash = %op_hash, error = %e, "Failed to journal recorded purchase");
                }
                self.audit.record(
                    AuditEvent::new(AuditEventType::PurchaseRecorded)
                        .with_operation(project_id, op_hash)
                        .with_details(serde_json::json!({ "quantity": record.quantity })),
                );
                info!(
                    op_hash = %op_hash,
                    project_id,
                    quantity = ?record.quantity,
                    "Purchase recorded"
                );
                Ok(record)
            }
            Err(e) => {
                let err = self.classify(project_id, receipt, e);
                self.note_failure(project_id, receipt, &err);
                Err(err)
            }
        }
    }

    fn classify(&self, project_id: u64, receipt: &OnChainReceipt, e: BackendError) -> PurchaseError {
        let receipt = receipt.clone();
        match e {
            BackendError::Unauthorized | BackendError::NotAuthenticated => {
                PurchaseError::SessionExpired {
                    project_id,
                    receipt,
                }
            }
            BackendError::Rejected { errors, .. } => PurchaseError::RecordRejected {
                project_id,
                receipt,
                errors,
            },
            other => PurchaseError::RecordingUnavailable {
                project_id,
                receipt,
                error: other.to_string(),
            },
        }
    }

    fn note_failure(&self, project_id: u64, receipt: &OnChainReceipt, err: &PurchaseError) {
        let op_hash = &receipt.operation_hash;

        match err {
            PurchaseError::RecordRejected { .. } => error!(
                op_hash = %op_hash,
                block_hash = %receipt.block_hash,
                project_id,
                error = %err,
                "Backend rejected confirmed payment"
            ),
            _ => warn!(
                op_hash = %op_hash,
                block_hash = %receipt.block_hash,
                project_id,
                error = %err,
                "Confirmed payment not recorded"
            ),
        }

        let noted = match err {
            PurchaseError::RecordRejected { .. } => {
                self.journal.note_rejection(op_hash, &err.to_string())
            }
            _ => self.journal.note_failure(op_hash, &err.to_string()),
        };
        if let Err(e) = noted {
            warn!(op_hash = %op_hash, error = %e, "Failed to journal reconciliation failure");
        }
        self.audit.record(
            AuditEvent::new(AuditEventType::ReconciliationFailed)
                .with_operation(project_id, op_hash)
                .failed(err.to_string()),
        );
    }
}
