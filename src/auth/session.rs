//! Fixed admin credential and in-memory session registry

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::SessionGate;

/// The single admin login
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Lifetime of a session token when none is configured
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Issues and tracks session tokens. A session lasts until logout or until
/// its time to live runs out, whichever is first.
pub struct SessionStore {
    credentials: AdminCredentials,
    ttl: Duration,
    /// token -> expiry
    sessions: RwLock<HashMap<String, Instant>>,
}

impl SessionStore {
    pub fn new(credentials: AdminCredentials) -> Self {
        Self::with_ttl(credentials, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(credentials: AdminCredentials, ttl: Duration) -> Self {
        Self {
            credentials,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session if the credentials match
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        if !self.credentials.matches(username, password) {
            warn!(username = %username, "Rejected login");
            return None;
        }

        let token = Uuid::new_v4().to_string();
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, expiry| *expiry > now);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "Dropped expired sessions");
        }
        sessions.insert(token.clone(), now + self.ttl);

        info!(ttl_secs = self.ttl.as_secs(), "Admin session started");
        Some(token)
    }

    /// End a session; false if the token was not live
    pub async fn logout(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token);
        removed.is_some_and(|expiry| expiry > Instant::now())
    }

    /// Tokens currently held, expired ones included until the next login
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionGate for SessionStore {
    async fn has_valid_session(&self, token: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(token)
            .is_some_and(|expiry| *expiry > Instant::now())
    }
}
