// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use super::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No session to authenticate the call with. Nothing was sent.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The backend rejected the session token. The session has been cleared.
    #[error("Session rejected by the backend")]
    Unauthorized,

    /// 4xx with a validation body.
    #[error("Request rejected ({status}): {errors}")]
    Rejected { status: u16, errors: FieldErrors },

    /// Transport failure, or a 429/5xx that outlived the retries.
    #[error("Network error for {url}: {error}")]
    Network {
        url: String,
        status: Option<u16>,
        error: String,
    },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Whether repeating the same idempotent call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Network { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Unauthorized => Some(401),
            BackendError::Rejected { status, .. } => Some(*status),
            BackendError::Network { status, .. } => *status,
            _ => None,
        }
    }
}
