//! Authentication for the console
//!
//! The server only needs to ask whether a token belongs to a live session;
//! that question is the `SessionGate` trait so handlers and tests never
//! depend on a concrete session store.

pub mod session;

pub use session::{AdminCredentials, SessionStore};

use async_trait::async_trait;

/// Session check injected into the server
#[async_trait]
pub trait SessionGate: Send + Sync {
    async fn has_valid_session(&self, token: &str) -> bool;
}

/// Pull a bearer token out of an Authorization header value
pub fn extract_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
