use axum::extract::State;
use axum::Json;

use super::ApiResponse;
use crate::model::EngineStatus;
use crate::AppState;

/// GET /api/engine/status — Model state and inference stats.
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<EngineStatus>> {
    Json(ApiResponse::ok(state.engine.status()))
}
