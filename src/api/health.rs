use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello, World!" }))
}

/// GET /health - Service status including database reachability
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    match state.table.ping().await {
        Ok(()) => Json(json!({ "status": "healthy", "database": "connected" })),
        Err(e) => {
            tracing::warn!("Health check failed: {e:#}");
            Json(json!({ "status": "unhealthy", "error": format!("{e:#}") }))
        }
    }
}

/// GET /annotation/health
pub async fn annotation_health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Annotation service is running." }))
}
