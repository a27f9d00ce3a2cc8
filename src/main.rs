//! license-console binary
//!
//! Serves the admin console over HTTP against the configured document store.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use license_console::{
    auth::SessionStore,
    config::{Args, StoreKind},
    server::{self, AppState},
    DocumentStore, GithubStore, MemoryStore, Orchestrator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("license_console={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let store: Arc<dyn DocumentStore> = match args.store {
        StoreKind::Github => {
            let config = args.github_config();
            info!(
                owner = %config.owner,
                repo = %config.repo,
                path = %config.path,
                "Using GitHub document store"
            );
            Arc::new(GithubStore::new(config)?)
        }
        StoreKind::Memory => {
            warn!("Using in-memory document store, records are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let orchestrator = Orchestrator::new(store, args.orchestrator_config());
    let sessions = Arc::new(SessionStore::with_ttl(
        args.admin_credentials(),
        args.session_ttl(),
    ));
    let state = AppState::new(orchestrator, sessions);

    info!(
        on_read_failure = ?args.on_read_failure,
        max_conflict_retries = args.max_conflict_retries,
        session_ttl_secs = args.session_ttl_secs,
        "Starting license-console"
    );
    server::serve(args.listen, state).await?;

    Ok(())
}
