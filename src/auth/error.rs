// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login flow errors.

use super::AuthState;
use crate::backend::{BackendError, FieldErrors};
use crate::error::ErrorKind;
use crate::storage::StorageError;
use crate::wallet::WalletError;

/// Why a login attempt did not end `Authenticated`.
///
/// The prior session, if any, is untouched by every variant.
#[derive(Debug)]
pub enum AuthError {
    /// No account could be resolved (no wallet, permission refused).
    WalletUnavailable(WalletError),
    /// The user refused to sign the challenge.
    SignatureDeclined,
    /// The wallet failed while signing.
    SignatureFailed(WalletError),
    /// The backend rejected the signed challenge.
    Rejected { status: u16, errors: FieldErrors },
    /// The backend could not be reached. Safe to re-run the whole login.
    Network(BackendError),
    /// The backend answered something that is not a session.
    InvalidResponse(String),
    /// The statement does not fit the payload length field.
    PayloadTooLarge(usize),
    /// The session was issued but could not be persisted.
    Storage(StorageError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::WalletUnavailable(e) if e.is_declined() => ErrorKind::UserDeclined,
            AuthError::WalletUnavailable(_) => ErrorKind::Unavailable,
            AuthError::SignatureDeclined => ErrorKind::UserDeclined,
            AuthError::SignatureFailed(_) | AuthError::Network(_) => ErrorKind::Unavailable,
            AuthError::Rejected { .. } => ErrorKind::ValidationRejected,
            AuthError::InvalidResponse(_)
            | AuthError::PayloadTooLarge(_)
            | AuthError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::WalletUnavailable(_) => "wallet_unavailable",
            AuthError::SignatureDeclined => "signature_declined",
            AuthError::SignatureFailed(_) => "signature_failed",
            AuthError::Rejected { .. } => "login_rejected",
            AuthError::Network(_) => "backend_unreachable",
            AuthError::InvalidResponse(_) => "invalid_response",
            AuthError::PayloadTooLarge(_) => "payload_too_large",
            AuthError::Storage(_) => "session_storage_error",
        }
    }

    /// Terminal state of the login state machine for this failure.
    pub fn terminal_state(&self) -> AuthState {
        match self {
            AuthError::SignatureDeclined => AuthState::Rejected,
            _ => AuthState::Failed,
        }
    }

    /// Message for the user. Backend validation messages are passed through
    /// verbatim.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected { errors, .. } => errors
                .first_message()
                .unwrap_or_else(|| "Login rejected".to_string()),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::WalletUnavailable(e) => write!(f, "Wallet unavailable: {e}"),
            AuthError::SignatureDeclined => write!(f, "Signature request was declined"),
            AuthError::SignatureFailed(e) => write!(f, "Signature request failed: {e}"),
            AuthError::Rejected { status, errors } => {
                write!(f, "Login rejected ({status}): {errors}")
            }
            AuthError::Network(e) => write!(f, "Backend unreachable: {e}"),
            AuthError::InvalidResponse(msg) => write!(f, "Unexpected login response: {msg}"),
            AuthError::PayloadTooLarge(len) => {
                write!(f, "Login statement too large to sign ({len} bytes)")
            }
            AuthError::Storage(e) => write!(f, "Failed to persist session: {e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::WalletUnavailable(e) | AuthError::SignatureFailed(e) => Some(e),
            AuthError::Network(e) => Some(e),
            AuthError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for AuthError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Rejected { status, errors } => AuthError::Rejected { status, errors },
            BackendError::InvalidResponse(msg) => AuthError::InvalidResponse(msg),
            BackendError::Unauthorized => AuthError::Rejected {
                status: 401,
                errors: FieldErrors::default(),
            },
            other => AuthError::Network(other),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        AuthError::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declined_permission_is_user_declined_but_failed() {
        let err = AuthError::WalletUnavailable(WalletError::Declined);
        assert_eq!(err.kind(), ErrorKind::UserDeclined);
        assert_eq!(err.terminal_state(), AuthState::Failed);
        assert_eq!(err.error_code(), "wallet_unavailable");
    }

    #[test]
    fn declined_signature_is_rejected() {
        assert_eq!(AuthError::SignatureDeclined.terminal_state(), AuthState::Rejected);
        assert_eq!(AuthError::SignatureDeclined.kind(), ErrorKind::UserDeclined);
    }

    #[test]
    fn backend_validation_message_is_verbatim() {
        let err = AuthError::from(BackendError::Rejected {
            status: 400,
            errors: FieldErrors::from_body(r#"{"non_field_errors":["Login message expired"]}"#),
        });
        assert_eq!(err.kind(), ErrorKind::ValidationRejected);
        assert_eq!(err.user_message(), "Login message expired");
    }

    #[test]
    fn network_failure_is_restartable() {
        let err = AuthError::from(BackendError::Network {
            url: "http://localhost:8000/api/login-by-wallet".to_string(),
            status: None,
            error: "connection refused".to_string(),
        });
        assert!(err.kind().is_restartable());
    }
}
