//! license-console - admin console for license records
//!
//! The records live as one JSON array inside a file hosted on GitHub. Every
//! admin operation is a read-modify-write against that file:
//!
//! - **Store**: fetch the document and its blob sha, commit a new version
//!   conditioned on that sha
//! - **Mutation**: pure transformations of the record list
//! - **Orchestrator**: fetch → mutate → commit, with the failure paths
//! - **Server**: a thin axum shell with a session gate in front of it

pub mod auth;
pub mod config;
pub mod document;
pub mod error;
pub mod mutation;
pub mod orchestrator;
pub mod record;
pub mod server;
pub mod store;

pub use config::Args;
pub use error::{ConsoleError, MutationError, Result, StoreError};
pub use mutation::Mutation;
pub use orchestrator::{OperationResult, Orchestrator, OrchestratorConfig, ReadFailurePolicy};
pub use record::Record;
pub use store::{DocumentStore, FetchOutcome, GithubStore, MemoryStore, Snapshot};
