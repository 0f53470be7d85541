//! services/api/src/web/middleware.rs
//!
//! Guards routes that only make sense once someone is logged in.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Middleware that rejects requests while no user is logged in.
///
/// If a user exists, inserts it into request extensions for handlers to use.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = state.shell.snapshot().user.ok_or_else(|| {
        debug!("Rejected {} {}: no user", req.method(), req.uri().path());
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
