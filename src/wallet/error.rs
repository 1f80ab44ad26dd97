// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet errors.

/// Errors reported by the wallet client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// No wallet extension/app reachable, or it timed out.
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    /// The user rejected the permission, signature or transfer prompt.
    #[error("Request declined by the user")]
    Declined,

    /// The wallet accepted the request but could not complete it.
    #[error("Wallet request failed: {0}")]
    Request(String),
}

impl WalletError {
    pub fn is_declined(&self) -> bool {
        matches!(self, WalletError::Declined)
    }
}
