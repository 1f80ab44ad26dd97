// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide wiring of the session, backend client, journal and audit log.
//!
//! Everything shared between flows lives in one [`FlowContext`], built once
//! from [`ClientConfig`] and passed explicitly to whoever needs it.

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthClient;
use crate::backend::{BackendClient, BackendError};
use crate::blockchain::{parse_tez, AmountError};
use crate::config::ClientConfig;
use crate::models::PurchaseIntent;
use crate::purchase::{PurchaseOrchestrator, Reconciler};
use crate::replay_poller::ReceiptReplayer;
use crate::storage::{
    AuditLog, FileStorage, JournalError, ReceiptJournal, SessionStore, StorageError, StoragePaths,
};
use crate::wallet::{WalletClient, WalletConnector};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Backend client error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Clone)]
pub struct FlowContext {
    pub config: Arc<ClientConfig>,
    pub session: Arc<SessionStore>,
    pub backend: Arc<BackendClient>,
    pub journal: Arc<ReceiptJournal>,
    pub audit: AuditLog,
    pub reconciler: Arc<Reconciler>,
}

impl FlowContext {
    /// Open the data directory, restoring any persisted session.
    ///
    /// The journal database is locked for as long as the context lives.
    pub fn open(config: ClientConfig) -> Result<Self, ContextError> {
        let storage = FileStorage::open(StoragePaths::new(&config.data_dir))?;
        let journal = Arc::new(ReceiptJournal::open(&storage.paths().journal_db())?);
        let audit = AuditLog::new(storage.clone());
        let session = Arc::new(SessionStore::load(storage)?);

        let backend = Arc::new(
            BackendClient::new(&config.api_base_url, Arc::clone(&session))?
                .with_audit(audit.clone()),
        );
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&backend),
            Arc::clone(&journal),
            audit.clone(),
        ));

        info!(
            data_dir = %config.data_dir.display(),
            network = %config.network.network_type,
            authenticated = session.is_authenticated(),
            "Flow context ready"
        );

        Ok(Self {
            config: Arc::new(config),
            session,
            backend,
            journal,
            audit,
            reconciler,
        })
    }

    fn connector<W: WalletClient>(&self, wallet: Arc<W>) -> WalletConnector<W> {
        WalletConnector::new(
            wallet,
            self.config.site_name.clone(),
            self.config.network.clone(),
        )
    }

    pub fn auth_client<W: WalletClient>(&self, wallet: Arc<W>) -> AuthClient<W> {
        AuthClient::new(
            self.connector(wallet),
            Arc::clone(&self.backend),
            Arc::clone(&self.session),
        )
        .with_audit(self.audit.clone())
    }

    pub fn purchase_orchestrator<W>(&self, wallet: Arc<W>) -> PurchaseOrchestrator<W>
    where
        W: WalletClient + Send + Sync + 'static,
    {
        PurchaseOrchestrator::new(
            self.connector(wallet),
            Arc::clone(&self.reconciler),
            self.config.contract.clone(),
            self.config.confirmations,
        )
        .with_audit(self.audit.clone())
    }

    pub fn replayer(&self) -> ReceiptReplayer {
        ReceiptReplayer::new(Arc::clone(&self.reconciler), Arc::clone(&self.session))
            .with_poll_interval(self.config.replay_interval)
    }

    /// Intent for `num_shares` at a decimal tez `share_price`, with the
    /// configured platform fee.
    pub fn purchase_intent(
        &self,
        project_id: u64,
        share_price: &str,
        num_shares: u32,
    ) -> Result<PurchaseIntent, AmountError> {
        Ok(PurchaseIntent::new(
            project_id,
            parse_tez(share_price)?,
            num_shares,
            self.config.fee_pct,
        ))
    }
}
