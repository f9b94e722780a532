use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use super::features::FeatureVector;
use super::loader::{load_first, LoadedModel};
use super::{Label, ModelError};

/// Lifecycle of the process-wide model. Terminal once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Loaded,
    Unavailable,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Loaded => "loaded",
            EngineState::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine status for the UI and health checks.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub online: bool,
    pub model_kind: Option<String>,
    pub model_name: Option<String>,
    pub source: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub inference_count: u64,
    pub avg_latency_ms: f64,
}

/// Lazily-loaded, never-invalidated model cache.
///
/// The candidate list is searched at most once, on the first call to
/// [`ModelEngine::handle`]. Concurrent first callers block on that single load.
pub struct ModelEngine {
    candidates: Vec<PathBuf>,
    model: OnceCell<Option<Arc<LoadedModel>>>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl ModelEngine {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            model: OnceCell::new(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Engine that is already resolved to the given model.
    pub fn with_model(model: LoadedModel) -> Self {
        let engine = Self::new(vec![model.source.clone()]);
        let _ = engine.model.set(Some(Arc::new(model)));
        gauge!("engine_online").set(1.0);
        engine
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// The cached model, loading it on first use. `None` means unavailable.
    pub fn handle(&self) -> Option<Arc<LoadedModel>> {
        self.model
            .get_or_init(|| {
                let loaded = load_first(&self.candidates).map(Arc::new);
                gauge!("engine_online").set(if loaded.is_some() { 1.0 } else { 0.0 });
                loaded
            })
            .clone()
    }

    /// Async counterpart of [`ModelEngine::handle`]. A cold engine is
    /// resolved on the blocking pool so the file read stays off the runtime.
    pub async fn resolve(self: &Arc<Self>) -> Option<Arc<LoadedModel>> {
        if self.state() != EngineState::Uninitialized {
            return self.handle();
        }

        let engine = Arc::clone(self);
        match tokio::task::spawn_blocking(move || engine.handle()).await {
            Ok(model) => model,
            Err(e) => {
                tracing::error!(error = %e, "Model load task failed");
                None
            }
        }
    }

    pub fn state(&self) -> EngineState {
        match self.model.get() {
            None => EngineState::Uninitialized,
            Some(Some(_)) => EngineState::Loaded,
            Some(None) => EngineState::Unavailable,
        }
    }

    /// Label a batch with the cached model, recording latency.
    pub fn predict(
        &self,
        model: &LoadedModel,
        batch: &[FeatureVector],
    ) -> Result<Vec<Label>, ModelError> {
        let started = Instant::now();
        let labels = model.predict(batch)?;
        let elapsed = started.elapsed();

        self.latency_sum_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        histogram!("inference_latency_seconds").record(elapsed.as_secs_f64());

        if labels.len() != batch.len() {
            return Err(ModelError::BatchMismatch {
                expected: batch.len(),
                got: labels.len(),
            });
        }
        Ok(labels)
    }

    /// Does not trigger a load.
    pub fn status(&self) -> EngineStatus {
        let state = self.state();
        let model = self.model.get().and_then(|m| m.as_ref());

        let count = self.inference_count.load(Ordering::Relaxed);
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let avg_latency_ms = if count > 0 {
            (sum as f64 / count as f64) / 1000.0
        } else {
            0.0
        };

        EngineStatus {
            state,
            online: state == EngineState::Loaded,
            model_kind: model.map(|m| m.kind().to_string()),
            model_name: model.and_then(|m| m.name.clone()),
            source: model.map(|m| m.source.display().to_string()),
            loaded_at: model.map(|m| m.loaded_at),
            inference_count: count,
            avg_latency_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Classifier;

    struct Fixed(Label);

    impl Classifier for Fixed {
        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
            Ok(vec![self.0; batch.len()])
        }
    }

    struct Empty;

    impl Classifier for Empty {
        fn kind(&self) -> &'static str {
            "empty"
        }

        fn predict(&self, _batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_unavailable_after_first_access() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ModelEngine::new(vec![dir.path().join("missing.json")]);

        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(!engine.status().online);

        assert!(engine.handle().is_none());
        assert_eq!(engine.state(), EngineState::Unavailable);
    }

    #[test]
    fn test_load_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"format_version": 1, "model": {"type": "decision_tree", "tree": {
                "children_left": [-1], "children_right": [-1], "feature": [-2],
                "threshold": [-2.0], "value": [[1, 0]]}}}"#,
        )
        .unwrap();

        let engine = ModelEngine::new(vec![path.clone()]);
        let first = engine.handle().unwrap();

        // Removing the artifact must not affect the cached handle.
        std::fs::remove_file(&path).unwrap();
        let second = engine.handle().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.state(), EngineState::Loaded);
        assert_eq!(engine.status().model_kind.as_deref(), Some("decision_tree"));
    }

    #[tokio::test]
    async fn test_resolve_loads_cold_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"format_version": 1, "model": {"type": "decision_tree", "tree": {
                "children_left": [-1], "children_right": [-1], "feature": [-2],
                "threshold": [-2.0], "value": [[1, 0]]}}}"#,
        )
        .unwrap();

        let engine = Arc::new(ModelEngine::new(vec![path]));
        assert_eq!(engine.state(), EngineState::Uninitialized);

        let first = engine.resolve().await.unwrap();
        assert_eq!(engine.state(), EngineState::Loaded);
        let second = engine.resolve().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_resolve_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ModelEngine::new(vec![dir.path().join("missing.json")]));

        assert!(engine.resolve().await.is_none());
        assert_eq!(engine.state(), EngineState::Unavailable);
    }

    #[test]
    fn test_predict_tracks_latency() {
        let engine = ModelEngine::with_model(LoadedModel::new(Arc::new(Fixed(1)), "mem"));
        let model = engine.handle().unwrap();
        let batch = [FeatureVector::from_transaction(10.0, 0.0)];

        assert_eq!(engine.predict(&model, &batch).unwrap(), vec![1]);
        assert_eq!(engine.predict(&model, &batch).unwrap(), vec![1]);
        assert_eq!(engine.status().inference_count, 2);
    }

    #[test]
    fn test_predict_batch_mismatch() {
        let engine = ModelEngine::with_model(LoadedModel::new(Arc::new(Empty), "mem"));
        let model = engine.handle().unwrap();
        let batch = [FeatureVector::from_transaction(10.0, 0.0)];

        assert!(matches!(
            engine.predict(&model, &batch),
            Err(ModelError::BatchMismatch { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"format_version": 1, "model": {"type": "decision_tree", "tree": {
                "children_left": [-1], "children_right": [-1], "feature": [-2],
                "threshold": [-2.0], "value": [[0, 1]]}}}"#,
        )
        .unwrap();

        let engine = Arc::new(ModelEngine::new(vec![path]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.handle().unwrap())
            })
            .collect();

        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
