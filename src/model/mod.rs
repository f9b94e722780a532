pub mod artifact;
pub mod engine;
pub mod features;
pub mod loader;

pub use artifact::{ModelArtifact, SUPPORTED_FORMAT_VERSION};
pub use engine::{EngineState, EngineStatus, ModelEngine};
pub use features::{FeatureVector, AMOUNT_INDEX, ELAPSED_TIME_INDEX, FEATURE_COUNT};
pub use loader::{load_artifact, load_first, LoadedModel};

use std::path::PathBuf;

use thiserror::Error;

/// Class label produced by a classifier. `1` means fraud.
pub type Label = i64;

pub const FRAUD_LABEL: Label = 1;

/// A loaded binary classifier.
///
/// The only capability the rest of the service relies on: label a batch of
/// fixed-width feature vectors, one label per row.
pub trait Classifier: Send + Sync {
    /// Short identifier of the model family, e.g. `random_forest`.
    fn kind(&self) -> &'static str;

    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError>;
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error("model returned {got} labels for a batch of {expected}")]
    BatchMismatch { expected: usize, got: usize },
}
