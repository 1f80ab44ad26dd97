// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable journal of submitted payments backed by redb.
//!
//! Every operation hash handed out by the wallet is written here before the
//! flow waits for confirmation, so a crash or an abandoned flow can resume
//! reconciliation without paying again.
//!
//! ## Table Layout
//!
//! - `purchase_receipts`: operation hash → serialized [`JournalEntry`]
//!
//! ## Lifecycle
//!
//! ```text
//! Submitted ──confirmation──▶ Confirmed ──backend record──▶ Recorded
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::blockchain::Mutez;
use crate::models::{AccountHandle, OnChainReceipt, OperationHash, PurchaseIntent, PurchaseRecord};

const RECEIPTS: TableDefinition<&str, &[u8]> = TableDefinition::new("purchase_receipts");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown operation: {0}")]
    NotFound(String),
}

pub type JournalResult<T> = Result<T, JournalError>;

// =============================================================================
// Entries
// =============================================================================

/// Reconciliation progress of a submitted payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    /// Injected, inclusion not yet observed.
    Submitted,
    /// Included on chain, backend not yet told.
    Confirmed,
    /// Backend holds the purchase record.
    Recorded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub operation_hash: OperationHash,
    pub project_id: u64,
    pub num_shares: u32,
    pub amount: Mutez,
    pub source: AccountHandle,
    pub status: JournalStatus,
    pub block_hash: Option<String>,
    #[serde(default)]
    pub confirmations: u32,
    pub record: Option<PurchaseRecord>,
    /// Failed settlement attempts since submission.
    #[serde(default)]
    pub attempts: u32,
    /// Attempts the backend answered with a validation error.
    #[serde(default)]
    pub rejections: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Receipt to replay, once the inclusion block is known.
    pub fn receipt(&self) -> Option<OnChainReceipt> {
        self.block_hash.as_ref().map(|block_hash| OnChainReceipt {
            operation_hash: self.operation_hash.clone(),
            block_hash: block_hash.clone(),
            confirmations: self.confirmations,
        })
    }

    pub fn is_recorded(&self) -> bool {
        self.status == JournalStatus::Recorded
    }
}

// =============================================================================
// ReceiptJournal
// =============================================================================

pub struct ReceiptJournal {
    db: Database,
}

impl ReceiptJournal {
    /// Open (or create) the journal at the given path.
    pub fn open(path: &Path) -> JournalResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create the table up front so read transactions never miss it
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECEIPTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Journal a freshly injected operation.
    ///
    /// Re-recording a known hash returns the existing entry untouched.
    pub fn record_submitted(
        &self,
        op_hash: &OperationHash,
        intent: &PurchaseIntent,
        amount: Mutez,
        source: &AccountHandle,
    ) -> JournalResult<JournalEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut table = write_txn.open_table(RECEIPTS)?;

            let existing = table
                .get(op_hash.as_str())?
                .map(|value| value.value().to_vec());

            match existing {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => {
                    let now = Utc::now();
                    let entry = JournalEntry {
                        operation_hash: op_hash.clone(),
                        project_id: intent.project_id,
                        num_shares: intent.num_shares,
                        amount,
                        source: source.clone(),
                        status: JournalStatus::Submitted,
                        block_hash: None,
                        confirmations: 0,
                        record: None,
                        attempts: 0,
                        rejections: 0,
                        last_error: None,
                        created_at: now,
                        updated_at: now,
                    };
                    let json = serde_json::to_vec(&entry)?;
                    table.insert(op_hash.as_str(), json.as_slice())?;
                    entry
                }
            }
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Store the inclusion block. A recorded entry keeps its status.
    pub fn mark_confirmed(&self, receipt: &OnChainReceipt) -> JournalResult<JournalEntry> {
        self.update(&receipt.operation_hash, |entry| {
            entry.block_hash = Some(receipt.block_hash.clone());
            entry.confirmations = receipt.confirmations;
            if entry.status == JournalStatus::Submitted {
                entry.status = JournalStatus::Confirmed;
            }
            entry.last_error = None;
        })
    }

    pub fn mark_recorded(
        &self,
        receipt: &OnChainReceipt,
        record: &PurchaseRecord,
    ) -> JournalResult<JournalEntry> {
        self.update(&receipt.operation_hash, |entry| {
            entry.block_hash = Some(receipt.block_hash.clone());
            entry.confirmations = receipt.confirmations;
            entry.status = JournalStatus::Recorded;
            entry.record = Some(record.clone());
            entry.last_error = None;
        })
    }

    /// Count a failed settlement attempt.
    pub fn note_failure(&self, op_hash: &OperationHash, error: &str) -> JournalResult<JournalEntry> {
        self.update(op_hash, |entry| {
            entry.attempts = entry.attempts.saturating_add(1);
            entry.last_error = Some(error.to_string());
        })
    }

    /// Count an attempt the backend rejected outright.
    pub fn note_rejection(
        &self,
        op_hash: &OperationHash,
        error: &str,
    ) -> JournalResult<JournalEntry> {
        self.update(op_hash, |entry| {
            entry.attempts = entry.attempts.saturating_add(1);
            entry.rejections = entry.rejections.saturating_add(1);
            entry.last_error = Some(error.to_string());
        })
    }

    pub fn get(&self, op_hash: &OperationHash) -> JournalResult<Option<JournalEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS)?;
        match table.get(op_hash.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All entries, oldest first.
    pub fn list(&self) -> JournalResult<Vec<JournalEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS)?;

        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_key, value) = item?;
            let entry: JournalEntry = serde_json::from_slice(value.value())?;
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    /// Entries the backend has not recorded yet, oldest first.
    pub fn unrecorded(&self) -> JournalResult<Vec<JournalEntry>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|entry| !entry.is_recorded())
            .collect())
    }

    fn update(
        &self,
        op_hash: &OperationHash,
        apply: impl FnOnce(&mut JournalEntry),
    ) -> JournalResult<JournalEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut table = write_txn.open_table(RECEIPTS)?;

            let existing_bytes = {
                let existing = table
                    .get(op_hash.as_str())?
                    .ok_or_else(|| JournalError::NotFound(op_hash.to_string()))?;
                existing.value().to_vec()
            };

            let mut entry: JournalEntry = serde_json::from_slice(&existing_bytes)?;
            apply(&mut entry);
            entry.updated_at = Utc::now();

            let json = serde_json::to_vec(&entry)?;
            table.insert(op_hash.as_str(), json.as_slice())?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }
}
