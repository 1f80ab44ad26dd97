// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Receipt Replayer
//!
//! Background task that re-posts confirmed but unrecorded receipts to the
//! backend, so a purchase whose recording step failed (expired session,
//! backend outage, abandoned flow) is eventually recorded.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 30 s) the replayer:
//! 1. Skips the sweep when no session is present.
//! 2. Lists the journal entries that are `Confirmed` but not `Recorded`.
//! 3. Replays each through the [`Reconciler`]. Only the recording step is
//!    ever repeated; payments are never resubmitted.
//! 4. Stops the sweep at the first rejected session (the 401 already
//!    cleared it).
//!
//! An entry the backend rejected `max_rejections` times (default 3) is held
//! back from the sweeps and left for an operator, who can replay it with
//! [`Reconciler::reconcile`]. Transport failures never hold an entry back.
//!
//! Entries still `Submitted` need the wallet to observe their confirmation
//! and are left to [`PurchaseOrchestrator::resume`](crate::purchase::PurchaseOrchestrator::resume).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::purchase::{PurchaseError, Reconciler};
use crate::storage::{JournalStatus, SessionStore};

/// Default interval between replay sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of backend rejections after which an entry is held back.
pub const DEFAULT_MAX_REJECTIONS: u32 = 3;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub recorded: usize,
    pub failed: usize,
    /// `Submitted` entries waiting for a confirmation.
    pub awaiting_confirmation: usize,
    /// Entries held back after repeated backend rejections.
    pub held: usize,
    /// Set when the sweep stopped on an expired session.
    pub session_expired: bool,
}

pub struct ReceiptReplayer {
    reconciler: Arc<Reconciler>,
    session: Arc<SessionStore>,
    poll_interval: Duration,
    max_rejections: u32,
}

impl ReceiptReplayer {
    pub fn new(reconciler: Arc<Reconciler>, session: Arc<SessionStore>) -> Self {
        Self {
            reconciler,
            session,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_rejections: DEFAULT_MAX_REJECTIONS,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_rejections(mut self, max_rejections: u32) -> Self {
        self.max_rejections = max_rejections.max(1);
        self
    }

    /// Run the replay loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(replayer.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Receipt replayer starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Receipt replayer shutting down");
                return;
            }

            self.replay_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Receipt replayer shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep over the unrecorded journal entries.
    pub async fn replay_step(&self) -> ReplaySummary {
        let mut summary = ReplaySummary::default();

        if !self.session.is_authenticated() {
            debug!("Receipt replayer: no session, skipping sweep");
            return summary;
        }

        let entries = match self.reconciler.journal().unrecorded() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Receipt replayer: failed to read journal");
                return summary;
            }
        };

        for entry in entries {
            if entry.status == JournalStatus::Submitted {
                summary.awaiting_confirmation += 1;
                continue;
            }
            if entry.rejections >= self.max_rejections {
                debug!(
                    op_hash = %entry.operation_hash,
                    rejections = entry.rejections,
                    "Receipt replayer: entry held for manual replay"
                );
                summary.held += 1;
                continue;
            }
            let Some(receipt) = entry.receipt() else {
                continue;
            };

            match self.reconciler.reconcile(entry.project_id, &receipt).await {
                Ok(_) => summary.recorded += 1,
                Err(PurchaseError::SessionExpired { .. }) => {
                    warn!(
                        op_hash = %receipt.operation_hash,
                        "Receipt replayer: session rejected, stopping sweep"
                    );
                    summary.failed += 1;
                    summary.session_expired = true;
                    break;
                }
                // Already logged with the operation hash by the reconciler
                Err(_) => summary.failed += 1,
            }
        }

        if summary.recorded + summary.failed > 0 {
            info!(
                recorded = summary.recorded,
                failed = summary.failed,
                awaiting_confirmation = summary.awaiting_confirmation,
                held = summary.held,
                "Receipt replayer: sweep finished"
            );
        }
        summary
    }
}
