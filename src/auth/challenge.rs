// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login challenge construction.
//!
//! The wallet signs a Micheline-packed string. The packing is fixed by the
//! wallet's `MICHELINE` signing mode and must be bit-exact:
//!
//! ```text
//! 05              packed Micheline value
//! 01              string tag
//! NNNNNNNN        byte length, 4 bytes big-endian
//! ...             UTF-8 bytes of the statement
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

use super::AuthError;
use crate::models::Challenge;

/// Packed-value prefix followed by the Micheline string tag.
pub const MICHELINE_STRING_PREFIX: &str = "0501";

/// Encodes login statements into signable payloads.
pub struct ChallengeEncoder;

impl ChallengeEncoder {
    /// `"0501" + 8 hex digit byte length + hex(statement)`.
    pub fn encode(statement: &str) -> Result<String, AuthError> {
        let bytes = statement.as_bytes();
        let len = u32::try_from(bytes.len())
            .map_err(|_| AuthError::PayloadTooLarge(bytes.len()))?;

        let mut payload = String::with_capacity(MICHELINE_STRING_PREFIX.len() + 8 + bytes.len() * 2);
        payload.push_str(MICHELINE_STRING_PREFIX);
        payload.push_str(&format!("{len:08x}"));
        payload.push_str(&hex::encode(bytes));
        Ok(payload)
    }
}

/// `I want to login on {site_name} at {issued_at}` with a second-precision
/// UTC timestamp.
pub fn login_statement(site_name: &str, issued_at: DateTime<Utc>) -> String {
    format!(
        "I want to login on {site_name} at {}",
        issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

impl Challenge {
    /// Build and encode a fresh challenge.
    pub fn issue(site_name: &str, issued_at: DateTime<Utc>) -> Result<Self, AuthError> {
        let statement = login_statement(site_name, issued_at);
        let payload_bytes = ChallengeEncoder::encode(&statement)?;
        Ok(Self {
            statement,
            issued_at,
            payload_bytes,
        })
    }
}
