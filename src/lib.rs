pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod risk;
pub mod verification;
pub mod web;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::model::ModelEngine;
use crate::verification::VerificationStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<ModelEngine>,
    pub verification: VerificationStore,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<ModelEngine>) -> Self {
        let verification = VerificationStore::new(config.session_ttl_secs);
        Self {
            config,
            engine,
            verification,
            metrics_handle: crate::metrics::init_metrics(),
        }
    }
}
