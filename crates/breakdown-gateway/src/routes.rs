use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use common::result::BreakdownResult;
use media_pipeline::run_breakdown;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/breakdowns", post(create_breakdown))
        .route("/v1/breakdowns/:task_id", get(get_breakdown))
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": common::VERSION }))
}

#[derive(Debug, Deserialize)]
pub struct CreateBreakdownRequest {
    pub video_url: String,
}

/// Run the pipeline for one locator and return the slim result. The full
/// result (complete payloads) stays in the task store under its task id.
async fn create_breakdown(
    State(state): State<AppState>,
    Json(req): Json<CreateBreakdownRequest>,
) -> Result<Json<BreakdownResult>, ApiError> {
    let locator = req.video_url.trim();
    if locator.is_empty() {
        return Err(ApiError::bad_request("video_url must not be empty"));
    }

    info!(locator = %locator, "breakdown requested");
    let result = run_breakdown(
        locator,
        state.config(),
        state.store(),
        state.request_token(),
    )
    .await?;

    Ok(Json(result.slim()))
}

async fn get_breakdown(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<BreakdownResult>, ApiError> {
    match state.store().get_result(&task_id).await {
        Ok(Some(result)) => Ok(Json(result)),
        Ok(None) => Err(ApiError::not_found(format!("unknown task: {}", task_id))),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}
