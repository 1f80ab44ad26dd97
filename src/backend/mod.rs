// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storefront backend REST API.
//!
//! | Endpoint | Auth | Retried |
//! |----------|------|---------|
//! | `POST login-by-wallet` | none | no |
//! | `POST projects/{id}/buy` | `token <t>` | yes |
//! | `GET checkin` | `token <t>` | yes |
//! | `GET logout` | `token <t>` | no |

pub mod client;
pub mod error;
pub mod types;

pub use client::{BackendClient, RetryPolicy, REQUEST_ID_HEADER};
pub use error::BackendError;
pub use types::{
    BuySharesRequest, FieldErrors, PatronSummary, ShareResponse, WalletLoginRequest,
    NON_FIELD_ERRORS,
};
