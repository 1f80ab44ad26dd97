// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Storage
//!
//! Local persistence for the flows: the session, the receipt journal and the
//! audit trail. Everything lives under one state directory (see
//! [`StoragePaths`]).
//!
//! ## Storage Layout
//!
//! ```text
//! .artcrowd/
//!   state/artcrowd.session.json
//!   journal.redb
//!   audit/{date}/events.jsonl
//! ```
//!
//! The session file holds the backend token in clear. The state directory
//! should only be readable by the user running the client.

pub mod audit;
pub mod file_store;
pub mod journal;
pub mod paths;
pub mod session;

pub use audit::{AuditEvent, AuditEventType, AuditLog};
pub use file_store::{FileStorage, StorageError, StorageResult};
pub use journal::{JournalEntry, JournalError, JournalStatus, ReceiptJournal};
pub use paths::{StoragePaths, DATA_ROOT, SESSION_KEY};
pub use session::SessionStore;
