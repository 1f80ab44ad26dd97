// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Purchase flow errors.
//!
//! Every variant raised after the wallet returned an operation hash carries
//! that hash, so a failed settlement can always be resumed.

use super::PurchaseState;
use crate::backend::FieldErrors;
use crate::blockchain::shorten_address;
use crate::error::ErrorKind;
use crate::models::{OnChainReceipt, OperationHash};
use crate::wallet::WalletError;

#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    // ========== Before payment ==========
    #[error("Invalid purchase: {0}")]
    InvalidIntent(String),

    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(WalletError),

    #[error("Payment declined by the user")]
    Declined,

    #[error("Payment could not be submitted: {0}")]
    SubmissionFailed(WalletError),

    // ========== After payment ==========
    #[error("Operation {op_hash} submitted but not confirmed: {error}")]
    ConfirmationPending {
        op_hash: OperationHash,
        error: WalletError,
    },

    #[error(
        "Payment {} confirmed but not recorded: session expired, log in again to resume",
        .receipt.operation_hash
    )]
    SessionExpired {
        project_id: u64,
        receipt: OnChainReceipt,
    },

    #[error("Payment {} confirmed but rejected by the backend: {errors}", .receipt.operation_hash)]
    RecordRejected {
        project_id: u64,
        receipt: OnChainReceipt,
        errors: FieldErrors,
    },

    #[error("Payment {} confirmed but the backend is unreachable: {error}", .receipt.operation_hash)]
    RecordingUnavailable {
        project_id: u64,
        receipt: OnChainReceipt,
        error: String,
    },

    /// The purchase task died. The payment may have been dispatched; its
    /// hash, if any, is in the receipt journal.
    #[error("Purchase for project {project_id} was interrupted: {reason}")]
    Interrupted { project_id: u64, reason: String },

    // ========== Resume ==========
    #[error("Unknown operation {0}")]
    UnknownOperation(OperationHash),

    #[error("Receipt journal error: {0}")]
    Journal(String),
}

impl PurchaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PurchaseError::InvalidIntent(_) => ErrorKind::ValidationRejected,
            PurchaseError::WalletUnavailable(e) if e.is_declined() => ErrorKind::UserDeclined,
            PurchaseError::WalletUnavailable(_) | PurchaseError::SubmissionFailed(_) => {
                ErrorKind::Unavailable
            }
            PurchaseError::Declined => ErrorKind::UserDeclined,
            PurchaseError::ConfirmationPending { .. }
            | PurchaseError::SessionExpired { .. }
            | PurchaseError::RecordRejected { .. }
            | PurchaseError::RecordingUnavailable { .. }
            | PurchaseError::Interrupted { .. } => ErrorKind::ReconciliationGap,
            PurchaseError::UnknownOperation(_) | PurchaseError::Journal(_) => ErrorKind::Internal,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            PurchaseError::InvalidIntent(_) => "invalid_intent",
            PurchaseError::WalletUnavailable(_) => "wallet_unavailable",
            PurchaseError::Declined => "payment_declined",
            PurchaseError::SubmissionFailed(_) => "submission_failed",
            PurchaseError::ConfirmationPending { .. } => "confirmation_pending",
            PurchaseError::SessionExpired { .. } => "session_expired",
            PurchaseError::RecordRejected { .. } => "record_rejected",
            PurchaseError::RecordingUnavailable { .. } => "recording_unavailable",
            PurchaseError::Interrupted { .. } => "settlement_interrupted",
            PurchaseError::UnknownOperation(_) => "unknown_operation",
            PurchaseError::Journal(_) => "journal_error",
        }
    }

    /// Terminal state of the purchase state machine for this failure.
    pub fn terminal_state(&self) -> PurchaseState {
        match self {
            PurchaseError::Declined => PurchaseState::Rejected,
            PurchaseError::WalletUnavailable(e) if e.is_declined() => PurchaseState::Rejected,
            PurchaseError::SessionExpired { .. } => PurchaseState::PartialFailure,
            _ => PurchaseState::Failed,
        }
    }

    /// Hash of the dispatched payment, if the failure happened after it.
    pub fn operation_hash(&self) -> Option<&OperationHash> {
        match self {
            PurchaseError::ConfirmationPending { op_hash, .. }
            | PurchaseError::UnknownOperation(op_hash) => Some(op_hash),
            PurchaseError::SessionExpired { receipt, .. }
            | PurchaseError::RecordRejected { receipt, .. }
            | PurchaseError::RecordingUnavailable { receipt, .. } => Some(&receipt.operation_hash),
            _ => None,
        }
    }

    /// Message to show the buyer. Operation hashes are shortened.
    pub fn user_message(&self) -> String {
        let short = |op_hash: &OperationHash| shorten_address(op_hash.as_str());
        match self {
            PurchaseError::Declined => "Payment cancelled in the wallet".to_string(),
            PurchaseError::ConfirmationPending { op_hash, .. } => format!(
                "Payment {} was sent but is not confirmed yet. It will be recorded once confirmed.",
                short(op_hash)
            ),
            PurchaseError::SessionExpired { receipt, .. } => format!(
                "Payment {} went through but your session expired. Log in again to record your shares.",
                short(&receipt.operation_hash)
            ),
            PurchaseError::RecordRejected {
                receipt, errors, ..
            } => format!(
                "Payment {} went through but could not be recorded: {}",
                short(&receipt.operation_hash),
                errors
                    .first_message()
                    .unwrap_or_else(|| "rejected by the server".to_string())
            ),
            PurchaseError::RecordingUnavailable { receipt, .. } => format!(
                "Payment {} went through. Your shares will be recorded when the server is reachable.",
                short(&receipt.operation_hash)
            ),
            other => other.to_string(),
        }
    }

    /// Whether only the recording step remains to be retried.
    pub fn is_payment_made(&self) -> bool {
        self.kind() == ErrorKind::ReconciliationGap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> OnChainReceipt {
        OnChainReceipt {
            operation_hash: "ooHash".into(),
            block_hash: "BLock".to_string(),
            confirmations: 1,
        }
    }

    #[test]
    fn session_expiry_is_partial_failure_with_hash() {
        let err = PurchaseError::SessionExpired {
            project_id: 42,
            receipt: receipt(),
        };
        assert_eq!(err.terminal_state(), PurchaseState::PartialFailure);
        assert_eq!(err.kind(), ErrorKind::ReconciliationGap);
        assert_eq!(err.operation_hash().map(|h| h.as_str()), Some("ooHash"));
        assert!(err.to_string().contains("ooHash"));
    }

    #[test]
    fn declined_payment_is_rejected_without_hash() {
        assert_eq!(PurchaseError::Declined.terminal_state(), PurchaseState::Rejected);
        assert!(PurchaseError::Declined.operation_hash().is_none());
        assert!(!PurchaseError::Declined.is_payment_made());
        assert!(PurchaseError::Declined.kind().is_restartable());
    }

    #[test]
    fn user_message_shortens_the_hash() {
        let err = PurchaseError::SessionExpired {
            project_id: 42,
            receipt: OnChainReceipt {
                operation_hash: "ooYMSbHZzLEqvRPqRLqrQUHDmGPfVJyZAhDGQZPHdV2fRT8jP6S".into(),
                block_hash: "BLock".to_string(),
                confirmations: 1,
            },
        };

        let message = err.user_message();

        assert!(message.starts_with("Payment ooYMS...8jP6S went through"));
        assert!(!message.contains("ooYMSbHZzLEqvRPqRLqrQUHDmGPfVJyZAhDGQZPHdV2fRT8jP6S"));
    }

    #[test]
    fn validation_gap_is_failed() {
        let err = PurchaseError::RecordRejected {
            project_id: 42,
            receipt: receipt(),
            errors: FieldErrors::from_body(r#"{"ophash":["unknown"]}"#),
        };
        assert_eq!(err.terminal_state(), PurchaseState::Failed);
        assert_eq!(err.user_message(), "Payment ooHash went through but could not be recorded: ophash: unknown");
        assert!(err.is_payment_made());
        assert!(!err.kind().is_restartable());
    }
}
