use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::agents::context::context_search;
use crate::agents::overview::meme_overview;
use crate::models::{AgentError, AnnotateRequest, AnnotateResponse, MemePatch};
use crate::state::AppState;

const AGENT_FAILED: &str = "Agent failed to process the meme.";

fn agent_error(status: StatusCode, error: impl std::fmt::Display, message: &str) -> Response {
    (
        status,
        Json(AgentError {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// POST /annotation/annotate - Overview of a meme, stored as `half_annotated`
pub async fn annotate_meme(
    State(state): State<AppState>,
    Json(req): Json<AnnotateRequest>,
) -> Response {
    tracing::info!("Annotating meme {} ({})", req.meme_id, req.meme_url);

    let llm_config = state.config.llm.clone();
    let overview = match meme_overview(&state.http_client, &llm_config, &req.meme_url).await {
        Ok(overview) => overview,
        Err(e) => {
            tracing::error!("Overview agent failed for {}: {e:#}", req.meme_id);
            return agent_error(StatusCode::BAD_GATEWAY, format!("{e:#}"), AGENT_FAILED);
        }
    };
    if overview.is_none() {
        tracing::warn!("No structured overview for meme {}", req.meme_id);
    }

    let patch = MemePatch::overview(overview.as_ref());
    if let Err(e) = store(&state, &req.meme_id, &patch).await {
        tracing::error!("Failed to store overview for {}: {e:#}", req.meme_id);
        return agent_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{e:#}"),
            "Failed to update meme annotation in the database.",
        );
    }

    Json(AnnotateResponse::new(req.meme_url, overview)).into_response()
}

/// POST /annotation/generate-context - Web context in Bengali, stored as `fully_annotated`
pub async fn generate_context(
    State(state): State<AppState>,
    Json(req): Json<AnnotateRequest>,
) -> Response {
    tracing::info!("Generating context for meme {} ({})", req.meme_id, req.meme_url);

    let llm_config = state.config.llm.clone();
    let context = match context_search(
        &state.http_client,
        &llm_config,
        state.search.as_ref(),
        &req.meme_url,
    )
    .await
    {
        Ok(Some(context)) if !context.trim().is_empty() => context,
        Ok(_) => {
            return Json(serde_json::json!({ "message": "No context found for the meme." }))
                .into_response();
        }
        Err(e) => {
            tracing::error!("Context agent failed for {}: {e:#}", req.meme_id);
            return agent_error(StatusCode::BAD_GATEWAY, format!("{e:#}"), AGENT_FAILED);
        }
    };

    if let Err(e) = store(&state, &req.meme_id, &MemePatch::context(&context)).await {
        tracing::error!("Failed to store context for {}: {e:#}", req.meme_id);
        return agent_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{e:#}"),
            "Failed to update meme context in the database.",
        );
    }

    Json(serde_json::json!({ "context": context })).into_response()
}

async fn store(state: &AppState, meme_id: &str, patch: &MemePatch) -> anyhow::Result<()> {
    let touched = state.table.update_by_id(meme_id, patch).await?;
    if touched == 0 {
        tracing::warn!("No meme row with id {meme_id}; annotation not stored");
    }
    Ok(())
}
