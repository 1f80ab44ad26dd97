// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Share Purchase
//!
//! Turns a [`PurchaseIntent`](crate::models::PurchaseIntent) into a backend
//! [`PurchaseRecord`](crate::models::PurchaseRecord) across an irreversible
//! on-chain payment.
//!
//! | Phase | Retry |
//! |-------|-------|
//! | submit (wallet transfer) | from scratch, only while nothing was paid |
//! | confirmation wait | [`PurchaseOrchestrator::resume`] |
//! | recording | [`Reconciler::reconcile`], idempotent on the operation hash |

pub mod error;
pub mod orchestrator;
pub mod reconciler;

pub use error::PurchaseError;
pub use orchestrator::{PurchaseOrchestrator, PurchaseState};
pub use reconciler::Reconciler;
