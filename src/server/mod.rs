//! HTTP shell around the orchestrator
//!
//! Provides:
//! - Login / logout with a bearer session token
//! - The dashboard listing as JSON view data
//! - One form-encoded POST route per record operation

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tracing::{debug, info};

use crate::auth::{extract_bearer, SessionGate, SessionStore};
use crate::orchestrator::Orchestrator;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub sessions: Arc<SessionStore>,
    pub gate: Arc<dyn SessionGate>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, sessions: Arc<SessionStore>) -> Self {
        Self {
            orchestrator,
            gate: sessions.clone(),
            sessions,
        }
    }
}

/// Bearer token of the request, if any
pub(crate) fn session_token(request_headers: &axum::http::HeaderMap) -> Option<String> {
    request_headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_string)
}

/// Redirect to the login entry point unless the request carries a live session
async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = match session_token(request.headers()) {
        Some(token) => state.gate.has_valid_session(&token).await,
        None => false,
    };

    if !authorized {
        debug!(path = %request.uri().path(), "No session, redirecting to login");
        return Redirect::to("/login").into_response();
    }

    next.run(request).await
}

/// Create the console router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/dashboard", get(routes::dashboard))
        .route("/logout", post(routes::logout))
        .route("/add-user", post(routes::add_user))
        .route("/delete-user", post(routes::delete_user))
        .route("/edit-password", post(routes::edit_password))
        .route("/change-validity", post(routes::change_validity))
        .route("/reset-hwid", post(routes::reset_hwid))
        .route("/toggle-blacklist", post(routes::toggle_blacklist))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(routes::index))
        .route("/login", get(routes::login_page).post(routes::login))
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(listen: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Console listening on http://{}", listen);
    axum::serve(listener, app).await
}
