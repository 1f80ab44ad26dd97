// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ArtCrowd Wallet - Tezos wallet login and share purchase client
//!
//! Proves control of a Tezos account to the ArtCrowd backend by signing a
//! login challenge, and turns an irreversible on-chain share purchase into
//! an idempotent backend record.
//!
//! ## Modules
//!
//! - `auth` - Challenge encoding and the login state machine
//! - `backend` - REST client for the ArtCrowd API
//! - `blockchain` - Tezos networks and mutez arithmetic
//! - `purchase` - Purchase state machine and receipt reconciliation
//! - `storage` - Session, receipt journal (redb) and audit log
//! - `wallet` - Wallet protocol boundary
//! - `replay_poller` - Background replay of unrecorded receipts

pub mod auth;
pub mod backend;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod purchase;
pub mod replay_poller;
pub mod state;
pub mod storage;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;
