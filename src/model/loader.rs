use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;

use super::artifact::ModelArtifact;
use super::features::FeatureVector;
use super::{Classifier, Label, ModelError};

/// A classifier together with where it came from.
#[derive(Clone)]
pub struct LoadedModel {
    classifier: Arc<dyn Classifier>,
    pub source: PathBuf,
    pub name: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn new(classifier: Arc<dyn Classifier>, source: impl Into<PathBuf>) -> Self {
        Self {
            classifier,
            source: source.into(),
            name: None,
            loaded_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
        self.classifier.predict(batch)
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("kind", &self.kind())
            .field("source", &self.source)
            .field("name", &self.name)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Load and validate a single artifact.
///
/// Directories and missing paths fail with `NotAFile` before any read is
/// attempted.
pub fn load_artifact(path: &Path) -> Result<LoadedModel, ModelError> {
    if !path.is_file() {
        return Err(ModelError::NotAFile(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let artifact = ModelArtifact::from_json(&raw)?;
    let name = artifact.name.clone();
    let classifier = artifact.into_classifier()?;

    Ok(LoadedModel {
        name,
        ..LoadedModel::new(classifier, path)
    })
}

/// Try each candidate in order and return the first one that loads.
///
/// Failures are logged and skipped; `None` means no candidate produced a
/// usable model.
pub fn load_first(candidates: &[PathBuf]) -> Option<LoadedModel> {
    if candidates.is_empty() {
        tracing::warn!("No model paths configured");
        return None;
    }

    for path in candidates {
        match load_artifact(path) {
            Ok(model) => {
                tracing::info!(
                    path = %path.display(),
                    kind = model.kind(),
                    name = model.name.as_deref().unwrap_or("-"),
                    "Model loaded"
                );
                return Some(model);
            }
            Err(ModelError::NotAFile(_)) => {
                tracing::debug!(path = %path.display(), "Model candidate is not a file, skipping");
            }
            Err(e) => {
                counter!("model_load_failures_total").increment(1);
                tracing::warn!(path = %path.display(), error = %e, "Failed to load model candidate");
            }
        }
    }

    tracing::warn!(
        candidates = candidates.len(),
        "No model candidate could be loaded"
    );
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
