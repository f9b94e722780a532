use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiResponse;
use crate::errors::AppError;
use crate::risk::{self, Assessment, Reason, Transaction, Verdict};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub session_id: Uuid,
    pub code: String,
    pub amount: f64,
    #[serde(default)]
    pub elapsed_time: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub verdict: Verdict,
    pub reason: Reason,
    pub amount: f64,
    pub formatted_amount: String,
    pub message: String,
    /// Code to use for the next submission.
    pub next_code: String,
}

/// Verify the code, validate input, claim the code and run the model.
///
/// Checks run in that order, and the model is never called unless the first
/// two pass. The code is rotated before inference, so the returned code stays
/// valid however long the analysis takes.
pub async fn run_analysis(
    state: &AppState,
    session_id: Uuid,
    code: &str,
    tx: Transaction,
) -> Result<(Assessment, String), AppError> {
    state.verification.verify(session_id, code).await?;

    if let Err(e) = risk::validate_transaction(&tx) {
        counter!("invalid_input_total").increment(1);
        return Err(e.into());
    }

    let model = state.engine.resolve().await.ok_or(AppError::ModelUnavailable)?;

    // Rejected input and an offline engine leave the code untouched.
    let next_code = state.verification.verify_and_rotate(session_id, code).await?;

    if state.config.analysis_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.config.analysis_delay_ms)).await;
    }

    let assessment = risk::evaluate(&state.engine, &model, &tx)?;
    Ok((assessment, next_code))
}

/// POST /api/analyze — Screen a transaction.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AnalyzeResponse>>, AppError> {
    let Json(req) = payload?;
    let tx = Transaction::new(req.amount, req.elapsed_time);
    let (assessment, next_code) = run_analysis(&state, req.session_id, &req.code, tx).await?;

    Ok(Json(ApiResponse::ok(AnalyzeResponse {
        verdict: assessment.verdict,
        reason: assessment.reason,
        amount: assessment.amount,
        message: assessment.message(),
        formatted_amount: assessment.formatted_amount,
        next_code,
    })))
}
