// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Failure taxonomy shared by every flow.
//!
//! Component errors (`AuthError`, `PurchaseError`, ...) keep their own
//! variants but classify themselves into one [`ErrorKind`], so a caller can
//! branch on the kind without matching every variant.

use serde::Serialize;

/// Coarse classification of a flow failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The user explicitly refused a wallet permission or signature.
    UserDeclined,
    /// Wallet or backend unreachable. Retry by re-running the whole flow.
    Unavailable,
    /// Backend semantic rejection (bad signature, stale challenge, invalid purchase).
    ValidationRejected,
    /// A confirmed payment is not (yet) recorded by the backend.
    ///
    /// Only the recording step may be retried, never the payment.
    ReconciliationGap,
    /// Local failure (storage, malformed data).
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::UserDeclined => "user_declined",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::ValidationRejected => "validation_rejected",
            ErrorKind::ReconciliationGap => "reconciliation_gap",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Whether re-running the flow from its first phase is safe.
    ///
    /// A reconciliation gap is never restartable from the start: the payment
    /// already happened.
    pub fn is_restartable(&self) -> bool {
        matches!(self, ErrorKind::UserDeclined | ErrorKind::Unavailable)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.error_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::UserDeclined.error_code(), "user_declined");
        assert_eq!(ErrorKind::ReconciliationGap.to_string(), "reconciliation_gap");
        assert_eq!(
            serde_json::to_string(&ErrorKind::ValidationRejected).unwrap(),
            r#""validation_rejected""#
        );
    }

    #[test]
    fn reconciliation_gap_is_not_restartable() {
        assert!(ErrorKind::Unavailable.is_restartable());
        assert!(ErrorKind::UserDeclined.is_restartable());
        assert!(!ErrorKind::ReconciliationGap.is_restartable());
        assert!(!ErrorKind::ValidationRejected.is_restartable());
    }
}
