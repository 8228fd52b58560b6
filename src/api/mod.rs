pub mod annotation;
pub mod health;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Error response carrying `{"detail": ...}`.
pub type DetailError = (StatusCode, Json<serde_json::Value>);

pub fn detail(status: StatusCode, message: impl Into<String>) -> DetailError {
    (status, Json(serde_json::json!({ "detail": message.into() })))
}

/// All routes, with the body limit taken from the upload config.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes();

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/upload/memes", post(upload::upload_memes))
        .route("/annotation/health", get(health::annotation_health))
        .route("/annotation/annotate", post(annotation::annotate_meme))
        .route("/annotation/generate-context", post(annotation::generate_context))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
