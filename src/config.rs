//! Configuration for the console
//!
//! CLI arguments with environment variable fallbacks using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::AdminCredentials;
use crate::orchestrator::{OrchestratorConfig, ReadFailurePolicy};
use crate::store::GithubConfig;

/// Which document store backs the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// GitHub contents API
    Github,
    /// In-process store, lost on exit
    Memory,
}

/// license-console - admin console for license records kept on GitHub
#[derive(Parser, Debug, Clone)]
#[command(name = "license-console")]
#[command(about = "Admin console for license records stored in a GitHub-hosted JSON document")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Document store backend
    #[arg(long, env = "STORE", value_enum, default_value = "github")]
    pub store: StoreKind,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Token used for the contents API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repository owner
    #[arg(long, env = "REPO_OWNER", default_value = "")]
    pub repo_owner: String,

    /// Repository name
    #[arg(long, env = "REPO_NAME", default_value = "")]
    pub repo_name: String,

    /// Path of the document inside the repository
    #[arg(long, env = "FILE_PATH", default_value = "Database.json")]
    pub file_path: String,

    /// Branch holding the document
    #[arg(long, env = "BRANCH", default_value = "main")]
    pub branch: String,

    /// Message used for every commit
    #[arg(long, env = "COMMIT_MESSAGE", default_value = "Update users via Admin Panel")]
    pub commit_message: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Admin login name
    #[arg(long, env = "ADMIN_USER")]
    pub admin_user: String,

    /// Admin login password
    #[arg(long, env = "ADMIN_PASS", hide_env_values = true)]
    pub admin_pass: String,

    /// Lifetime of an admin session in seconds
    #[arg(long, env = "SESSION_TTL_SECS", default_value = "3600")]
    pub session_ttl_secs: u64,

    /// Behaviour when the document cannot be read before an update
    #[arg(long, env = "ON_READ_FAILURE", value_enum, default_value = "degrade")]
    pub on_read_failure: ReadFailurePolicy,

    /// Extra attempts after a version conflict (0 disables retrying)
    #[arg(long, env = "MAX_CONFLICT_RETRIES", default_value = "0")]
    pub max_conflict_retries: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Check the configuration before anything is started
    pub fn validate(&self) -> Result<(), String> {
        if self.admin_user.is_empty() || self.admin_pass.is_empty() {
            return Err("ADMIN_USER and ADMIN_PASS must not be empty".to_string());
        }

        if self.store == StoreKind::Github {
            if self.repo_owner.is_empty() || self.repo_name.is_empty() {
                return Err("REPO_OWNER and REPO_NAME are required for the github store".to_string());
            }
            if self.github_token.is_none() {
                return Err("GITHUB_TOKEN is required for the github store".to_string());
            }
            if self.file_path.trim_matches('/').is_empty() {
                return Err("FILE_PATH must name a file".to_string());
            }
        }

        if self.timeout_secs == 0 {
            return Err("TIMEOUT_SECS must be greater than zero".to_string());
        }

        if self.session_ttl_secs == 0 {
            return Err("SESSION_TTL_SECS must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn github_config(&self) -> GithubConfig {
        GithubConfig {
            api_base: self.github_api_url.clone(),
            owner: self.repo_owner.clone(),
            repo: self.repo_name.clone(),
            path: self.file_path.clone(),
            branch: self.branch.clone(),
            token: self.github_token.clone(),
            commit_message: self.commit_message.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            read_failure: self.on_read_failure,
            max_conflict_retries: self.max_conflict_retries,
        }
    }

    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials {
            username: self.admin_user.clone(),
            password: self.admin_pass.clone(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "license-console",
            "--admin-user",
            "admin",
            "--admin-pass",
            "pw",
            "--repo-owner",
            "acme",
            "--repo-name",
            "licenses",
            "--github-token",
            "ghp_test",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert!(args.validate().is_ok());

        let github = args.github_config();
        assert_eq!(github.path, "Database.json");
        assert_eq!(github.branch, "main");
        assert_eq!(github.commit_message, "Update users via Admin Panel");
        assert_eq!(github.timeout_secs, 30);

        let orch = args.orchestrator_config();
        assert_eq!(orch.read_failure, ReadFailurePolicy::Degrade);
        assert_eq!(orch.max_conflict_retries, 0);

        assert_eq!(args.session_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_session_ttl_must_be_positive() {
        let args = parse(&["--session-ttl-secs", "900"]);
        assert_eq!(args.session_ttl(), Duration::from_secs(900));

        let args = parse(&["--session-ttl-secs", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_policy_flags() {
        let args = parse(&["--on-read-failure", "abort", "--max-conflict-retries", "3"]);
        let orch = args.orchestrator_config();
        assert_eq!(orch.read_failure, ReadFailurePolicy::Abort);
        assert_eq!(orch.max_conflict_retries, 3);
    }

    #[test]
    fn test_memory_store_needs_no_repo() {
        let args = Args::try_parse_from([
            "license-console",
            "--store",
            "memory",
            "--admin-user",
            "admin",
            "--admin-pass",
            "pw",
        ])
        .unwrap();
        assert_eq!(args.store, StoreKind::Memory);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_github_store_requires_repo() {
        let mut args = parse(&[]);
        args.repo_name.clear();
        assert!(args.validate().is_err());

        let mut args = parse(&[]);
        args.github_token = None;
        assert!(args.validate().is_err());
    }
}
