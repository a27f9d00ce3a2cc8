//! In-process document store
//!
//! Keeps the encoded document body and a version counter (`v1`, `v2`, ...).
//! Commit rules match the contents API: a versioned write must name the
//! current version, and a version-less write is only accepted while the
//! document does not exist.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{DocumentStore, Snapshot};
use crate::document;
use crate::error::{Result, StoreError};
use crate::record::Record;

const DOCUMENT_NAME: &str = "memory://document";

struct Stored {
    body: Vec<u8>,
    revision: u64,
}

impl Stored {
    fn version(&self) -> String {
        format!("v{}", self.revision)
    }
}

/// A commit request as received, whether or not it was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct CommitAttempt {
    pub records: Vec<Record>,
    pub version: Option<String>,
    pub accepted: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<Option<Stored>>,
    attempts: Mutex<Vec<CommitAttempt>>,
    unreachable: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    /// Store with no document
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a document at version `v1`
    pub fn with_records(records: Vec<Record>) -> Self {
        let store = Self::new();
        if let Ok(body) = document::to_body(&records) {
            *lock(&store.document) = Some(Stored { body, revision: 1 });
        }
        store
    }

    /// Make every load and commit fail as if the host were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Current version, if the document exists
    pub fn version(&self) -> Option<String> {
        lock(&self.document).as_ref().map(Stored::version)
    }

    /// Current records, bypassing the unreachable switch
    pub fn records(&self) -> Vec<Record> {
        lock(&self.document)
            .as_ref()
            .and_then(|stored| document::from_body(&stored.body).ok())
            .unwrap_or_default()
    }

    /// Every commit received so far
    pub fn commit_attempts(&self) -> Vec<CommitAttempt> {
        lock(&self.attempts).clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable(DOCUMENT_NAME.to_string()));
        }
        Ok(())
    }

    fn try_commit(&self, records: &[Record], version: Option<&str>) -> Result<()> {
        self.check_reachable()?;
        let body = document::to_body(records)?;

        let mut current = lock(&self.document);
        let revision = match (current.as_ref(), version) {
            (None, None) => 1,
            (Some(stored), Some(expected)) if stored.version() == expected => stored.revision + 1,
            (Some(stored), Some(expected)) => {
                return Err(StoreError::Conflict(format!(
                    "expected {}, store is at {}",
                    expected,
                    stored.version()
                )))
            }
            (Some(stored), None) => {
                return Err(StoreError::Conflict(format!(
                    "document exists at {}, no version supplied",
                    stored.version()
                )))
            }
            (None, Some(expected)) => {
                return Err(StoreError::Conflict(format!(
                    "expected {}, document does not exist",
                    expected
                )))
            }
        };

        *current = Some(Stored { body, revision });
        debug!(version = %format!("v{}", revision), "Committed document");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        self.check_reachable()?;

        let current = lock(&self.document);
        match current.as_ref() {
            Some(stored) => Ok(Snapshot {
                records: document::from_body(&stored.body)?,
                version: Some(stored.version()),
            }),
            None => Err(StoreError::NotFound(DOCUMENT_NAME.to_string())),
        }
    }

    async fn commit(&self, records: &[Record], version: Option<&str>) -> Result<()> {
        let result = self.try_commit(records, version);

        lock(&self.attempts).push(CommitAttempt {
            records: records.to_vec(),
            version: version.map(str::to_string),
            accepted: result.is_ok(),
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_write_without_version() {
        let store = MemoryStore::new();
        store
            .commit(&[Record::new("alice", "pw", 30)], None)
            .await
            .unwrap();

        assert_eq!(store.version().as_deref(), Some("v1"));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_versioned_write_advances() {
        let store = MemoryStore::with_records(vec![]);
        store
            .commit(&[Record::new("alice", "pw", 30)], Some("v1"))
            .await
            .unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.version.as_deref(), Some("v2"));
        assert_eq!(snapshot.records[0].username, "alice");
    }

    #[tokio::test]
    async fn test_racing_commits_one_wins() {
        let store = MemoryStore::with_records(vec![Record::new("alice", "pw", 30)]);
        let base = store.load().await.unwrap();
        let version = base.version.as_deref();

        let mut first = base.records.clone();
        first[0].password = "first".into();
        let mut second = base.records.clone();
        second[0].password = "second".into();

        let a = store.commit(&first, version).await;
        let b = store.commit(&second, version).await;

        assert!(a.is_ok());
        assert!(matches!(b, Err(StoreError::Conflict(_))));
        assert_eq!(store.records()[0].password, "first");

        let attempts = store.commit_attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].accepted);
        assert!(!attempts[1].accepted);
    }

    #[tokio::test]
    async fn test_unversioned_write_over_existing_rejected() {
        let store = MemoryStore::with_records(vec![Record::new("alice", "pw", 30)]);
        let result = store.commit(&[], None).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let store = MemoryStore::with_records(vec![]);
        store.set_unreachable(true);

        assert!(matches!(store.load().await, Err(StoreError::Unreachable(_))));
        assert!(store.commit(&[], Some("v1")).await.is_err());

        store.set_unreachable(false);
        assert!(store.load().await.is_ok());
    }
}
