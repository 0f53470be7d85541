//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for login and logout.

use crate::app::shell::ShellError;
use crate::web::state::{lock, AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_aid_core::domain::{Credentials, User};
use tracing::{error, info};
use utoipa::ToSchema;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Sign in through the configured authenticator
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let credentials = Credentials {
        email: req.email.trim().to_string(),
        password: req.password,
    };

    let user = state.shell.authenticate(&credentials).await.map_err(|e| match e {
        ShellError::LoginRejected => (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()),
        other => {
            error!("Authentication failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
        }
    })?;

    state.publish_view();
    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}

/// POST /auth/logout - Forget the user and the textbook
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logout successful"))
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.shell.logout().await;
    *lock(&state.learning) = None;
    lock(&state.mistakes).close();
    info!("Session reset after logout.");
    state.publish_view();
    StatusCode::OK
}
