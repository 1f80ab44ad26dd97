// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout of the persistent client state directory.

use std::path::{Path, PathBuf};

/// Default state directory, relative to the working directory.
pub const DATA_ROOT: &str = ".artcrowd";

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "artcrowd.session";

/// Path utilities for the client state directory.
///
/// ```text
/// {root}/
///   state/artcrowd.session.json   # current session ({ token, ...profile })
///   journal.redb                  # purchase receipt journal
///   audit/{date}/events.jsonl     # daily audit logs
/// ```
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of small key/value state files.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// File backing a storage key.
    pub fn key_file(&self, key: &str) -> PathBuf {
        self.state_dir().join(format!("{key}.json"))
    }

    pub fn session_file(&self) -> PathBuf {
        self.key_file(SESSION_KEY)
    }

    /// redb database holding purchase receipts.
    pub fn journal_db(&self) -> PathBuf {
        self.root.join("journal.redb")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// JSONL file for a given day (`YYYY-MM-DD`).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date).join("events.jsonl")
    }
}
