// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The single persisted session.
//!
//! The store is the only owner of session state. Flows read it, the login
//! flow sets it, logout and a backend 401 clear it. Changes are published on
//! a watch channel so an embedding UI can follow sign-in state.

use tokio::sync::watch;
use tracing::{info, warn};

use super::{FileStorage, StorageError, StorageResult, SESSION_KEY};
use crate::models::Session;

pub struct SessionStore {
    storage: Option<FileStorage>,
    current: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Load the persisted session, if any.
    ///
    /// An unreadable session file is discarded: the user simply logs in again.
    pub fn load(storage: FileStorage) -> StorageResult<Self> {
        let session = match storage.read_key::<Session>(SESSION_KEY) {
            Ok(session) => session,
            Err(StorageError::Json(e)) => {
                warn!(error = %e, "Discarding unreadable session");
                storage.delete_key(SESSION_KEY)?;
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(session) = &session {
            info!(username = %session.username(), "Restored session");
        }

        Ok(Self {
            storage: Some(storage),
            current: watch::Sender::new(session),
        })
    }

    /// Session kept in memory only.
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            current: watch::Sender::new(None),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// Bearer token of the current session.
    pub fn token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Persist then publish `session`, replacing any previous one.
    pub fn set(&self, session: Session) -> StorageResult<()> {
        if let Some(storage) = &self.storage {
            storage.write_key(SESSION_KEY, &session)?;
        }
        self.current.send_replace(Some(session));
        Ok(())
    }

    /// Remove the persisted session, then publish `None`.
    ///
    /// The in-memory session is dropped even when the file cannot be
    /// removed; the error is still returned so the caller can report that a
    /// stale token remains on disk.
    pub fn clear(&self) -> StorageResult<()> {
        let removed = match &self.storage {
            Some(storage) => storage.delete_key(SESSION_KEY),
            None => Ok(()),
        };
        self.current.send_replace(None);
        removed
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileSummary;
    use crate::storage::StoragePaths;

    fn session(token: &str) -> Session {
        Session::new(
            token,
            ProfileSummary {
                username: "alice".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn session_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(StoragePaths::new(dir.path())).unwrap();

        let store = SessionStore::load(storage.clone()).unwrap();
        assert!(!store.is_authenticated());
        store.set(session("T")).unwrap();

        let reloaded = SessionStore::load(storage.clone()).unwrap();
        assert_eq!(reloaded.token().as_deref(), Some("T"));
        assert_eq!(reloaded.current().unwrap().username(), "alice");

        reloaded.clear().unwrap();
        assert!(!storage.paths().session_file().exists());
        assert!(SessionStore::load(storage).unwrap().current().is_none());
    }

    #[test]
    fn corrupt_session_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(StoragePaths::new(dir.path())).unwrap();
        std::fs::write(storage.paths().session_file(), b"{\"token\":").unwrap();

        let store = SessionStore::load(storage.clone()).unwrap();

        assert!(store.current().is_none());
        assert!(!storage.paths().session_file().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_is_gone_before_subscribers_see_logout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(StoragePaths::new(dir.path())).unwrap();
        let store = SessionStore::load(storage.clone()).unwrap();
        store.set(session("T")).unwrap();

        let mut rx = store.subscribe();
        rx.borrow_and_update();
        let session_file = storage.paths().session_file();
        let watcher = tokio::spawn(async move {
            rx.changed().await.unwrap();
            assert!(rx.borrow().is_none());
            session_file.exists()
        });

        store.clear().unwrap();

        assert!(!watcher.await.unwrap());
    }

    #[test]
    fn failed_delete_still_drops_session_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(StoragePaths::new(dir.path())).unwrap();
        let store = SessionStore::load(storage.clone()).unwrap();
        store.set(session("T")).unwrap();

        // A non-empty directory in place of the file cannot be unlinked
        let session_file = storage.paths().session_file();
        std::fs::remove_file(&session_file).unwrap();
        std::fs::create_dir(&session_file).unwrap();
        std::fs::write(session_file.join("keep"), b"x").unwrap();

        assert!(matches!(store.clear(), Err(StorageError::Io(_))));
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_set_and_clear() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();

        store.set(session("T")).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.token.clone()), Some("T".into()));

        store.clear().unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
