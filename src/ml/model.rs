//! Uniform model adapter over the two artifact kinds.
//!
//! A [`Model`] is loaded once at startup and then only read. `predict` has
//! no side effects, so one instance can be shared across request handlers
//! behind an `Arc` without locking.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OutputMode;
use crate::error::{LifeboatError, Result};
use crate::ml::dense::DenseNetwork;
use crate::ml::forest::RandomForest;
use crate::payload::FeatureMatrix;

/// Probabilities strictly above this are the positive class.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary classifier over fixed-width feature rows.
pub trait Classifier {
    /// Column count the model was fit with.
    fn n_features(&self) -> usize;

    /// Positive-class score in [0, 1] for one row.
    fn score_row(&self, row: &[f64]) -> Result<f64>;

    fn check_features(&self, matrix: &FeatureMatrix) -> Result<()> {
        if matrix.n_cols() != self.n_features() {
            return Err(LifeboatError::FeatureCountMismatch {
                expected: self.n_features(),
                got: matrix.n_cols(),
            });
        }
        Ok(())
    }

    fn predict_scores(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_features(matrix)?;
        matrix.rows().map(|row| self.score_row(row)).collect()
    }

    fn predict_labels(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>> {
        Ok(self
            .predict_scores(matrix)?
            .into_iter()
            .map(|p| u8::from(p > DECISION_THRESHOLD))
            .collect())
    }
}

/// On-disk model artifact, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(RandomForest),
    DenseNetwork(DenseNetwork),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "random_forest",
            Self::DenseNetwork(_) => "dense_network",
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::RandomForest(f) => f.validate(),
            Self::DenseNetwork(n) => n.validate_classifier(),
        }
    }

    fn classifier(&self) -> &dyn Classifier {
        match self {
            Self::RandomForest(f) => f,
            Self::DenseNetwork(n) => n,
        }
    }
}

/// Per-request prediction output. Serializes as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Labels(Vec<u8>),
    Probabilities(Vec<f64>),
}

impl PredictionResult {
    /// Placeholder answer returned when a request body cannot be decoded.
    pub fn fallback() -> Self {
        Self::Labels(vec![0])
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Labels(v) => v.len(),
            Self::Probabilities(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A validated, loaded model.
#[derive(Debug, Clone)]
pub struct Model {
    artifact: ModelArtifact,
}

impl Model {
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        artifact.validate().map_err(LifeboatError::Validation)?;
        Ok(Self { artifact })
    }

    /// Read and validate an artifact file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let corrupt = |reason: String| LifeboatError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LifeboatError::ArtifactNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(corrupt(e.to_string())),
        };
        let artifact: ModelArtifact =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        artifact.validate().map_err(corrupt)?;

        info!(
            model_path = %path.display(),
            kind = artifact.kind(),
            n_features = artifact.classifier().n_features(),
            "loaded model artifact"
        );
        Ok(Self { artifact })
    }

    /// Write the artifact as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.artifact)?;
        std::fs::write(path, json)?;
        Ok(path.to_path_buf())
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn kind(&self) -> &'static str {
        self.artifact.kind()
    }

    pub fn n_features(&self) -> usize {
        self.artifact.classifier().n_features()
    }

    /// One discrete 0/1 label per input row.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>> {
        self.artifact.classifier().predict_labels(matrix)
    }

    /// One positive-class probability per input row.
    pub fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.artifact.classifier().predict_scores(matrix)
    }

    pub fn predict_with(&self, matrix: &FeatureMatrix, mode: OutputMode) -> Result<PredictionResult> {
        match mode {
            OutputMode::Labels => self.predict(matrix).map(PredictionResult::Labels),
            OutputMode::Probabilities => self.predict_proba(matrix).map(PredictionResult::Probabilities),
        }
    }
}
