//! Update orchestrator
//!
//! Sequences one admin operation: fetch the document, apply the mutation to
//! a local copy, commit it back against the fetched version. A commit that
//! fails is reported together with a fresh read for display.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ConsoleError;
use crate::mutation::Mutation;
use crate::record::Record;
use crate::store::{DocumentStore, FetchOutcome, Snapshot};

/// Prefix of every failure message shown to the admin
pub const FAILURE_PREFIX: &str = "Failed to update GitHub database: ";

/// What to do when the document could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReadFailurePolicy {
    /// Continue as if the document were empty
    #[default]
    Degrade,
    /// Stop before mutating and report the read failure
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub read_failure: ReadFailurePolicy,
    /// Extra fetch-reapply-commit rounds after a version conflict (0 = none)
    pub max_conflict_retries: u32,
}

/// Outcome of one operation
#[derive(Debug)]
pub enum OperationResult {
    Success,
    Failed {
        error: ConsoleError,
        /// Best-effort re-read for display
        records: Vec<Record>,
    },
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success)
    }

    /// Message for the admin, `None` on success
    pub fn error_message(&self) -> Option<String> {
        match self {
            OperationResult::Success => None,
            OperationResult::Failed { error, .. } => Some(format!("{}{}", FAILURE_PREFIX, error)),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn DocumentStore>, config: OrchestratorConfig) -> Self {
        Self { store, config }
    }

    /// Current records for the listing view, empty on any read failure
    pub async fn list(&self) -> Vec<Record> {
        self.store.fetch().await.records
    }

    /// Run one mutation against the remote document
    pub async fn apply(&self, mutation: &Mutation) -> OperationResult {
        let mut retries = 0;

        loop {
            match self.attempt(mutation).await {
                Ok(()) => {
                    info!(
                        operation = mutation.kind(),
                        username = %mutation.username(),
                        retries,
                        "Operation committed"
                    );
                    return OperationResult::Success;
                }
                Err(ConsoleError::Write(e))
                    if e.is_conflict() && retries < self.config.max_conflict_retries =>
                {
                    retries += 1;
                    warn!(
                        operation = mutation.kind(),
                        error = %e,
                        retry = retries,
                        "Version conflict, re-fetching and reapplying"
                    );
                }
                Err(error) => {
                    warn!(
                        operation = mutation.kind(),
                        username = %mutation.username(),
                        error = %error,
                        "Operation failed"
                    );
                    let records = self.store.fetch().await.records;
                    return OperationResult::Failed { error, records };
                }
            }
        }
    }

    async fn attempt(&self, mutation: &Mutation) -> Result<(), ConsoleError> {
        let snapshot = match self.store.fetch_snapshot().await {
            FetchOutcome::Found(snapshot) => snapshot,
            FetchOutcome::Missing => Snapshot::default(),
            FetchOutcome::Unreachable(e) => match self.config.read_failure {
                ReadFailurePolicy::Degrade => {
                    warn!(error = %e, "Document unreachable, continuing with an empty list");
                    Snapshot::default()
                }
                ReadFailurePolicy::Abort => return Err(ConsoleError::Read(e)),
            },
        };

        let records = mutation.apply(snapshot.records)?;
        self.store
            .commit(&records, snapshot.version.as_deref())
            .await
            .map_err(ConsoleError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MutationError, Result, StoreError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn alice() -> Record {
        Record::new("alice", "pw", 30)
    }

    fn toggle(username: &str) -> Mutation {
        Mutation::ToggleBlacklist {
            username: username.into(),
        }
    }

    fn orchestrator(store: Arc<dyn DocumentStore>, config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::new(store, config)
    }

    /// Lets another admin commit right before each of our first `races` commits
    struct RacingStore {
        inner: MemoryStore,
        races: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn load(&self) -> Result<Snapshot> {
            self.inner.load().await
        }

        async fn commit(&self, records: &[Record], version: Option<&str>) -> Result<()> {
            if self.races.load(Ordering::SeqCst) > 0 {
                self.races.fetch_sub(1, Ordering::SeqCst);
                let current = self.inner.load().await?;
                let mut theirs = current.records;
                theirs.push(Record::new(format!("other{}", theirs.len()), "pw", 30));
                self.inner.commit(&theirs, current.version.as_deref()).await?;
            }
            self.inner.commit(records, version).await
        }
    }

    /// Reads fail, writes go through
    struct BrokenReads {
        inner: MemoryStore,
    }

    #[async_trait]
    impl DocumentStore for BrokenReads {
        async fn load(&self) -> Result<Snapshot> {
            Err(StoreError::Server {
                status: 503,
                message: "unavailable".into(),
            })
        }

        async fn commit(&self, records: &[Record], version: Option<&str>) -> Result<()> {
            self.inner.commit(records, version).await
        }
    }

    #[tokio::test]
    async fn test_toggle_commits_against_fetched_version() {
        let store = Arc::new(MemoryStore::with_records(vec![alice()]));
        let orch = orchestrator(store.clone(), OrchestratorConfig::default());

        let result = orch.apply(&toggle("alice")).await;
        assert!(result.is_success());
        assert_eq!(result.error_message(), None);

        let attempts = store.commit_attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].version.as_deref(), Some("v1"));
        assert!(attempts[0].records[0].blacklisted);
        assert!(store.records()[0].blacklisted);
    }

    #[tokio::test]
    async fn test_conflict_reported_without_retry() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::with_records(vec![alice()]),
            races: AtomicU32::new(1),
        });
        let orch = orchestrator(store.clone(), OrchestratorConfig::default());

        let result = orch.apply(&toggle("alice")).await;
        match &result {
            OperationResult::Failed { error, records } => {
                assert!(matches!(error, ConsoleError::Write(StoreError::Conflict(_))));
                assert_eq!(records.len(), 2);
            }
            OperationResult::Success => panic!("conflict should fail"),
        }
        assert!(result
            .error_message()
            .unwrap()
            .starts_with("Failed to update GitHub database: Version conflict"));

        // the other admin's write stands, ours was not applied
        let remote = store.inner.records();
        assert_eq!(remote.len(), 2);
        assert!(!remote[0].blacklisted);
    }

    #[tokio::test]
    async fn test_conflict_retry_reapplies_on_fresh_state() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::with_records(vec![alice()]),
            races: AtomicU32::new(2),
        });
        let config = OrchestratorConfig {
            max_conflict_retries: 2,
            ..Default::default()
        };
        let orch = orchestrator(store.clone(), config);

        assert!(orch.apply(&toggle("alice")).await.is_success());

        let remote = store.inner.records();
        assert_eq!(remote.len(), 3);
        assert!(remote[0].blacklisted);
        assert_eq!(store.inner.version().as_deref(), Some("v4"));
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::with_records(vec![alice()]),
            races: AtomicU32::new(3),
        });
        let config = OrchestratorConfig {
            max_conflict_retries: 1,
            ..Default::default()
        };
        let orch = orchestrator(store.clone(), config);

        assert!(!orch.apply(&toggle("alice")).await.is_success());
        assert!(!store.inner.records()[0].blacklisted);
    }

    #[tokio::test]
    async fn test_duplicate_aborts_before_commit() {
        let store = Arc::new(MemoryStore::with_records(vec![alice()]));
        let orch = orchestrator(store.clone(), OrchestratorConfig::default());

        let result = orch
            .apply(&Mutation::AddUser {
                username: "alice".into(),
                password: "x".into(),
                validity: "30".into(),
            })
            .await;

        match result {
            OperationResult::Failed { error, records } => {
                assert!(matches!(
                    error,
                    ConsoleError::Mutation(MutationError::DuplicateUser(_))
                ));
                assert_eq!(records, vec![alice()]);
            }
            OperationResult::Success => panic!("duplicate should fail"),
        }
        assert!(store.commit_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_document_first_write() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(store.clone(), OrchestratorConfig::default());

        let result = orch
            .apply(&Mutation::AddUser {
                username: "bob".into(),
                password: "pw".into(),
                validity: "notanumber".into(),
            })
            .await;

        assert!(result.is_success());
        assert_eq!(store.commit_attempts()[0].version, None);
        assert_eq!(store.records()[0].validity_days, Some(30));
    }

    #[tokio::test]
    async fn test_read_failure_degrades_by_default() {
        let store = Arc::new(BrokenReads {
            inner: MemoryStore::new(),
        });
        let orch = orchestrator(store.clone(), OrchestratorConfig::default());

        let result = orch
            .apply(&Mutation::AddUser {
                username: "bob".into(),
                password: "pw".into(),
                validity: "30".into(),
            })
            .await;
        assert!(result.is_success());

        let attempts = store.inner.commit_attempts();
        assert_eq!(attempts[0].records.len(), 1);
        assert_eq!(attempts[0].version, None);
    }

    #[tokio::test]
    async fn test_read_failure_abort_policy() {
        let store = Arc::new(BrokenReads {
            inner: MemoryStore::new(),
        });
        let config = OrchestratorConfig {
            read_failure: ReadFailurePolicy::Abort,
            ..Default::default()
        };
        let orch = orchestrator(store.clone(), config);

        let result = orch.apply(&toggle("alice")).await;
        match result {
            OperationResult::Failed { error, records } => {
                assert!(matches!(error, ConsoleError::Read(_)));
                assert!(records.is_empty());
            }
            OperationResult::Success => panic!("abort policy should fail"),
        }
        assert!(store.inner.commit_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_list() {
        let store = Arc::new(MemoryStore::with_records(vec![alice()]));
        let orch = orchestrator(store.clone(), OrchestratorConfig::default());
        assert_eq!(orch.list().await, vec![alice()]);

        store.set_unreachable(true);
        assert!(orch.list().await.is_empty());
    }
}
