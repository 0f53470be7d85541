pub mod auth;
pub mod dispatch;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod views;
pub mod ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_user;
pub use rest::ApiDoc;
pub use state::AppState;
pub use ws_handler::ws_handler;

const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Builds the full application router: public routes, user-only routes and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no user required)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/view", get(rest::view_handler))
        .route("/ws", get(ws_handler));

    // Routes that need a logged-in user
    let protected_routes = Router::new()
        .route(
            "/mistakes",
            get(rest::list_mistakes_handler).post(rest::upload_mistake_handler),
        )
        .route("/mistakes/{id}", get(rest::get_mistake_handler))
        .route("/learning/audio", get(rest::podcast_audio_handler))
        .route("/sketch", get(rest::sketch_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_user,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
