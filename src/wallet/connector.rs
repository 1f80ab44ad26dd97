// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account resolution shared by login and purchase.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{PermissionRequest, WalletClient, WalletError};
use crate::blockchain::Network;
use crate::models::AccountHandle;

/// Resolves the account to use, reusing an existing grant when present.
///
/// Failures are never retried here; a new attempt needs a user action.
pub struct WalletConnector<W> {
    wallet: Arc<W>,
    app_name: String,
    network: Network,
}

impl<W> Clone for WalletConnector<W> {
    fn clone(&self) -> Self {
        Self {
            wallet: Arc::clone(&self.wallet),
            app_name: self.app_name.clone(),
            network: self.network.clone(),
        }
    }
}

impl<W: WalletClient> WalletConnector<W> {
    /// `app_name` is the site name shown in the wallet prompt.
    pub fn new(wallet: Arc<W>, app_name: impl Into<String>, network: Network) -> Self {
        Self {
            wallet,
            app_name: app_name.into(),
            network,
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Return the active account, or prompt for a permission grant.
    pub async fn connect(&self) -> Result<AccountHandle, WalletError> {
        match self.wallet.get_active_account().await {
            Ok(Some(account)) => {
                debug!(account = %account, "Wallet already connected");
                return Ok(account);
            }
            Ok(None) => {}
            Err(e) => {
                // An unreadable grant is treated as no grant
                warn!(error = %e, "Failed to read active wallet account");
            }
        }

        let request = PermissionRequest {
            app_name: self.app_name.clone(),
            network: self.network.clone(),
        };

        match self.wallet.request_permissions(&request).await {
            Ok(account) => {
                info!(
                    account = %account,
                    network = %self.network.network_type,
                    "Wallet permission granted"
                );
                Ok(account)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    network = %self.network.network_type,
                    "Wallet permission request failed"
                );
                Err(e)
            }
        }
    }
}
