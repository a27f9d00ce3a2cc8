//! Remote document store
//!
//! A store hands out the current record list together with a version token
//! and accepts a new list conditioned on that token:
//! - `GithubStore`: the GitHub contents API (version = blob sha)
//! - `MemoryStore`: in-process store with the same compare-and-swap rules

pub mod github;
pub mod memory;

pub use github::{GithubConfig, GithubStore};
pub use memory::MemoryStore;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::record::Record;

/// Records plus the version they were read at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
    /// `None` when the document does not exist yet
    pub version: Option<String>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>, version: impl Into<String>) -> Self {
        Self {
            records,
            version: Some(version.into()),
        }
    }
}

/// Outcome of a read, keeping "does not exist" apart from "could not read"
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Snapshot),
    Missing,
    Unreachable(StoreError),
}

impl FetchOutcome {
    /// Collapse into a snapshot, empty with no version unless found
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            FetchOutcome::Found(snapshot) => snapshot,
            FetchOutcome::Missing | FetchOutcome::Unreachable(_) => Snapshot::default(),
        }
    }
}

/// Versioned storage for the record document
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current document. A missing document is `StoreError::NotFound`.
    async fn load(&self) -> Result<Snapshot>;

    /// Write a new version. With `version` set the write only succeeds if
    /// the stored version still matches; without it the write is a first
    /// write. A mismatch is `StoreError::Conflict`.
    async fn commit(&self, records: &[Record], version: Option<&str>) -> Result<()>;

    /// Tagged read
    async fn fetch_snapshot(&self) -> FetchOutcome {
        match self.load().await {
            Ok(snapshot) => FetchOutcome::Found(snapshot),
            Err(StoreError::NotFound(path)) => {
                warn!(path = %path, "Document not found, treating as empty");
                FetchOutcome::Missing
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch document");
                FetchOutcome::Unreachable(e)
            }
        }
    }

    /// Read that never fails: any error yields an empty list and no version
    async fn fetch(&self) -> Snapshot {
        self.fetch_snapshot().await.into_snapshot()
    }
}
