use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use super::ApiResponse;
use crate::errors::AppError;
use crate::verification::IssuedCode;
use crate::AppState;

/// POST /api/sessions — Start a session and get its security code.
pub async fn create(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<IssuedCode>>) {
    let issued = state.verification.issue().await;
    tracing::debug!(session = %issued.session_id, "Verification session issued");
    (StatusCode::CREATED, Json(ApiResponse::ok(issued)))
}

/// POST /api/sessions/:id/regenerate — Replace the session's security code.
pub async fn regenerate(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let Path(id) = path?;
    let code = state.verification.regenerate(id).await?;
    Ok(Json(ApiResponse::ok(json!({ "session_id": id, "code": code }))))
}
