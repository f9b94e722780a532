use std::sync::Arc;

use securepay::api::router::create_router;
use securepay::config::AppConfig;
use securepay::model::{EngineState, ModelEngine};
use securepay::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr();
    // Recorder must exist before the model load reports failures.
    securepay::metrics::init_metrics();

    // --- Model: resolve once, before serving ---
    let engine = Arc::new(ModelEngine::new(config.model_paths.clone()));
    tracing::info!(
        candidates = engine.candidates().len(),
        "Loading fraud model..."
    );
    engine.resolve().await;

    match engine.state() {
        EngineState::Loaded => tracing::info!("Core engine ONLINE"),
        _ => tracing::warn!("Core engine OFFLINE — analysis features are disabled"),
    }

    let state = AppState::new(config, engine);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
