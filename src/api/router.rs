use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Browser form
    let pages = Router::new()
        .route("/", get(handlers::page::index))
        .route("/analyze", post(handlers::page::analyze))
        .route("/regenerate", post(handlers::page::regenerate));

    let api = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render))
        .route("/api/engine/status", get(handlers::engine::status))
        .route("/api/sessions", post(handlers::sessions::create))
        .route("/api/sessions/:id/regenerate", post(handlers::sessions::regenerate))
        .route("/api/analyze", post(handlers::analyze::analyze));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    pages
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
