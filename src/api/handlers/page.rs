use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Html;
use axum::Form;
use serde::Deserialize;
use uuid::Uuid;

use super::analyze::run_analysis;
use crate::errors::AppError;
use crate::model::EngineStatus;
use crate::risk::Transaction;
use crate::verification::IssuedCode;
use crate::web::{render_page, Outcome, PageView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub elapsed_time: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub session_id: Option<Uuid>,
}

/// Blank numeric fields count as zero.
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse().ok()
}

/// Resolves the model first so a cold engine is not reported as offline.
async fn engine_status(state: &AppState) -> EngineStatus {
    let _ = state.engine.resolve().await;
    state.engine.status()
}

async fn page_view(state: &AppState) -> PageView {
    let engine = engine_status(state).await;
    let session = if engine.online {
        Some(state.verification.issue().await)
    } else {
        None
    };
    PageView::new(engine, session)
}

/// Current session, or a fresh one if it is gone.
async fn resume_session(state: &AppState, session_id: Option<Uuid>) -> IssuedCode {
    if let Some(id) = session_id {
        if let Some(code) = state.verification.current(id).await {
            return IssuedCode {
                session_id: id,
                code,
            };
        }
    }
    state.verification.issue().await
}

/// GET / — The analysis form.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&page_view(&state).await))
}

/// Page for a submission whose body could not be decoded.
async fn rejected_view(state: &AppState, engine: EngineStatus, rejection: FormRejection) -> PageView {
    let err = AppError::from(rejection);
    tracing::debug!(error = %err, "Form submission rejected");

    let mut view = PageView::new(engine, Some(state.verification.issue().await));
    view.outcome = Some(Outcome::Warning(err.user_message()));
    view
}

/// POST /analyze — Form submission.
pub async fn analyze(
    State(state): State<AppState>,
    form: Result<Form<AnalyzeForm>, FormRejection>,
) -> Html<String> {
    let engine = engine_status(&state).await;
    if !engine.online {
        return Html(render_page(&PageView::new(engine, None)));
    }

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return Html(render_page(&rejected_view(&state, engine, rejection).await)),
    };

    let (session, outcome) = match form.session_id {
        None => (
            state.verification.issue().await,
            Outcome::Warning(AppError::UnknownSession.user_message()),
        ),
        Some(id) => {
            // Unparseable numbers fall through to input validation.
            let tx = Transaction::new(
                parse_number(&form.amount).unwrap_or(f64::NAN),
                parse_number(&form.elapsed_time).unwrap_or(f64::NAN),
            );
            match run_analysis(&state, id, &form.code, tx).await {
                Ok((assessment, next_code)) => (
                    IssuedCode {
                        session_id: id,
                        code: next_code,
                    },
                    Outcome::Assessed(assessment),
                ),
                Err(e) => (
                    resume_session(&state, Some(id)).await,
                    Outcome::Warning(e.user_message()),
                ),
            }
        }
    };

    let mut view = PageView::new(state.engine.status(), Some(session));
    view.amount = form.amount;
    view.elapsed_time = form.elapsed_time;
    view.outcome = Some(outcome);
    Html(render_page(&view))
}

/// POST /regenerate — New security code for the form's session.
pub async fn regenerate(
    State(state): State<AppState>,
    form: Result<Form<SessionForm>, FormRejection>,
) -> Html<String> {
    let engine = engine_status(&state).await;
    if !engine.online {
        return Html(render_page(&PageView::new(engine, None)));
    }

    let session_id = match form {
        Ok(Form(form)) => form.session_id,
        Err(rejection) => return Html(render_page(&rejected_view(&state, engine, rejection).await)),
    };

    let session = match session_id {
        Some(id) => match state.verification.regenerate(id).await {
            Ok(code) => IssuedCode { session_id: id, code },
            Err(_) => state.verification.issue().await,
        },
        None => state.verification.issue().await,
    };

    Html(render_page(&PageView::new(engine, Some(session))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("abc"), None);
    }
}
