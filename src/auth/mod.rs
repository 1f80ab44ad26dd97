// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Login
//!
//! Proves control of a wallet account to the backend and obtains a session.
//!
//! ## Auth Flow
//!
//! 1. Resolve the account through the wallet (existing grant or prompt)
//! 2. Build `I want to login on {site} at {timestamp}` and pack it as a
//!    Micheline string
//! 3. Ask the wallet to sign the packed payload
//! 4. `POST login-by-wallet { wallet, message, signature }`
//! 5. Persist `{ token, ...profile }` in the [`SessionStore`](crate::storage::SessionStore)
//!
//! Only step 5 mutates the session. A failure at any step leaves the
//! previous session in place.

pub mod challenge;
pub mod client;
pub mod error;

pub use challenge::{login_statement, ChallengeEncoder, MICHELINE_STRING_PREFIX};
pub use client::{AuthClient, AuthState};
pub use error::AuthError;
