use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::risk::EvaluationError;
use crate::verification::VerificationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Fraud engine is offline: no model could be loaded")]
    ModelUnavailable,

    #[error("Verification failed: incorrect security code")]
    VerificationMismatch,

    #[error("Verification failed: session expired, reload the page")]
    UnknownSession,

    #[error("Please enter a valid amount")]
    InvalidAmount,

    #[error("Please enter a valid elapsed time")]
    InvalidElapsedTime,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::VerificationMismatch | AppError::UnknownSession => StatusCode::FORBIDDEN,
            AppError::InvalidAmount | AppError::InvalidElapsedTime => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Internal server error".into()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}

impl From<VerificationError> for AppError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Mismatch => AppError::VerificationMismatch,
            VerificationError::UnknownSession => AppError::UnknownSession,
        }
    }
}

impl From<EvaluationError> for AppError {
    fn from(e: EvaluationError) -> Self {
        match e {
            EvaluationError::InvalidAmount => AppError::InvalidAmount,
            EvaluationError::InvalidElapsedTime => AppError::InvalidElapsedTime,
            EvaluationError::Inference(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
