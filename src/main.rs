// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `artcrowd-reconciler`: replays confirmed but unrecorded share purchases
//! with the persisted session until interrupted.

use std::process::ExitCode;

use artcrowd_wallet::config::{ClientConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV};
use artcrowd_wallet::state::FlowContext;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let ctx = match FlowContext::open(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "Failed to open client state");
            return ExitCode::FAILURE;
        }
    };

    if !ctx.session.is_authenticated() {
        warn!("No saved session; receipts will be replayed after the next login");
    }
    match ctx.journal.unrecorded() {
        Ok(pending) => info!(pending = pending.len(), "Unrecorded receipts in journal"),
        Err(e) => warn!(error = %e, "Failed to read receipt journal"),
    }

    let shutdown = CancellationToken::new();
    let replayer = tokio::spawn(ctx.replayer().run(shutdown.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested");
    shutdown.cancel();

    if let Err(e) = replayer.await {
        error!(error = %e, "Receipt replayer task failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
