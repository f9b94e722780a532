use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::model::EngineState;
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.state();

    if engine == EngineState::Loaded {
        (StatusCode::OK, Json(json!({ "status": "healthy", "engine": "online" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "engine": engine.as_str() })),
        )
    }
}
