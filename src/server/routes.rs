//! Console HTTP routes
//!
//! Views are returned as JSON data; a successful operation redirects back
//! to the dashboard, a failed one renders the dashboard with the error.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};

use super::{session_token, AppState};
use crate::mutation::Mutation;
use crate::orchestrator::OperationResult;
use crate::record::Record;

/// Where a successful operation lands
pub const SUCCESS_REDIRECT: &str = "/dashboard?success=Operation%20Successful";

/// Dashboard view data
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardView {
    pub users: Vec<Record>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Login view data
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginView {
    pub error: Option<String>,
    /// Bearer token for subsequent requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub success: Option<String>,
}

#[derive(Deserialize)]
pub struct AddUserForm {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub validity: String,
}

#[derive(Deserialize)]
pub struct UsernameForm {
    pub username: String,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ValidityForm {
    pub username: String,
    #[serde(default)]
    pub validity: String,
}

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET /login
pub async fn login_page() -> Json<LoginView> {
    Json(LoginView {
        error: None,
        token: None,
    })
}

/// POST /login
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Json<LoginView> {
    match state.sessions.login(&form.username, &form.password).await {
        Some(token) => Json(LoginView {
            error: None,
            token: Some(token),
        }),
        None => Json(LoginView {
            error: Some("Invalid credentials".to_string()),
            token: None,
        }),
    }
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if let Some(token) = session_token(&headers) {
        state.sessions.logout(&token).await;
    }
    Redirect::to("/login")
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardView> {
    Json(DashboardView {
        users: state.orchestrator.list().await,
        error: None,
        success: query.success,
    })
}

async fn handle_update(state: &AppState, mutation: Mutation) -> Response {
    let result = state.orchestrator.apply(&mutation).await;
    let error = result.error_message();

    match result {
        OperationResult::Success => Redirect::to(SUCCESS_REDIRECT).into_response(),
        OperationResult::Failed { records, .. } => Json(DashboardView {
            users: records,
            error,
            success: None,
        })
        .into_response(),
    }
}

/// POST /add-user
pub async fn add_user(State(state): State<AppState>, Form(form): Form<AddUserForm>) -> Response {
    let mutation = Mutation::AddUser {
        username: form.username,
        password: form.password,
        validity: form.validity,
    };
    handle_update(&state, mutation).await
}

/// POST /delete-user
pub async fn delete_user(State(state): State<AppState>, Form(form): Form<UsernameForm>) -> Response {
    let mutation = Mutation::DeleteUser {
        username: form.username,
    };
    handle_update(&state, mutation).await
}

/// POST /edit-password
pub async fn edit_password(
    State(state): State<AppState>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let mutation = Mutation::EditPassword {
        username: form.username,
        password: form.password,
    };
    handle_update(&state, mutation).await
}

/// POST /change-validity
pub async fn change_validity(
    State(state): State<AppState>,
    Form(form): Form<ValidityForm>,
) -> Response {
    let mutation = Mutation::ChangeValidity {
        username: form.username,
        validity: form.validity,
    };
    handle_update(&state, mutation).await
}

/// POST /reset-hwid
pub async fn reset_hwid(State(state): State<AppState>, Form(form): Form<UsernameForm>) -> Response {
    let mutation = Mutation::ResetHwid {
        username: form.username,
    };
    handle_update(&state, mutation).await
}

/// POST /toggle-blacklist
pub async fn toggle_blacklist(
    State(state): State<AppState>,
    Form(form): Form<UsernameForm>,
) -> Response {
    let mutation = Mutation::ToggleBlacklist {
        username: form.username,
    };
    handle_update(&state, mutation).await
}
