// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tezos chain vocabulary used by the wallet flows.
//!
//! This module provides:
//! - Network descriptors handed to the wallet (`{ type, rpcUrl }`)
//! - Integer mutez amounts and the payable-amount computation
//! - Display helpers for amounts and addresses
//!
//! The chain itself is only reached through the wallet; nothing here talks
//! to a node.

pub mod amount;
pub mod types;

pub use amount::{format_tez, parse_tez, payable_amount, shorten_address, AmountError};
pub use types::*;
