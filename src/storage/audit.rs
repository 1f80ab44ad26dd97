// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail of login and payment events.
//!
//! Events are appended to a daily JSONL file. Writing an event never fails
//! the flow that emits it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{FileStorage, StorageResult};
use crate::models::OperationHash;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Session events
    LoginSucceeded,
    LoginFailed,
    LoggedOut,
    SessionInvalidated,

    // Payment events
    PaymentSubmitted,
    PaymentConfirmed,
    PurchaseRecorded,
    ReconciliationFailed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Wallet account involved, if known.
    pub account: Option<String>,
    pub operation_hash: Option<OperationHash>,
    pub project_id: Option<u64>,
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            account: None,
            operation_hash: None,
            project_id: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_operation(mut self, project_id: u64, op_hash: &OperationHash) -> Self {
        self.project_id = Some(project_id);
        self.operation_hash = Some(op_hash.clone());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Append-only audit log. A log without storage drops events.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    storage: Option<FileStorage>,
}

impl AuditLog {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    pub fn disabled() -> Self {
        Self { storage: None }
    }

    /// Append an event to today's file.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = storage.paths().audit_events_file(&date);
        let line = serde_json::to_string(event)?;
        storage.append_line(path, &line)
    }

    /// Like [`log`](Self::log), reporting failures through tracing only.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.log(&event) {
            warn!(
                event_type = ?event.event_type,
                error = %e,
                "Failed to write audit event"
            );
        }
    }

    /// Read all events for a given date (`YYYY-MM-DD`).
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let Some(storage) = &self.storage else {
            return Ok(Vec::new());
        };

        let path = storage.paths().audit_events_file(date);
        if !storage.exists(&path) {
            return Ok(Vec::new());
        }

        let data = storage.read_raw(&path)?;
        let content = String::from_utf8_lossy(&data);

        let mut events = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<AuditEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(error = %e, "Skipping malformed audit line"),
            }
        }
        Ok(events)
    }
}
