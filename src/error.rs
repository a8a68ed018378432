use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the classifier service
#[derive(Error, Debug)]
pub enum LifeboatError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Request payload errors
    #[error("Content type {0:?} not supported")]
    UnsupportedContentType(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    // Model errors
    #[error("Feature count mismatch: model expects {expected}, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("Model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Model artifact corrupt: {} ({reason})", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    // Invoker errors
    #[error("Invalid input. {0}")]
    InvalidInvocationShape(String),

    #[error("Upstream invocation failed: {0}")]
    UpstreamInvocationFailure(String),

    // Training errors
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Training error: {0}")]
    Training(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LifeboatError {
    /// HTTP status used when the error is rendered by the inference endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedContentType(_) => 415,
            Self::MalformedPayload(_)
            | Self::FeatureCountMismatch { .. }
            | Self::InvalidInvocationShape(_)
            | Self::Validation(_) => 400,
            Self::UpstreamInvocationFailure(_) | Self::Http(_) => 502,
            _ => 500,
        }
    }
}

/// Result type alias for LifeboatError
pub type Result<T> = std::result::Result<T, LifeboatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_errors_are_unsupported_media() {
        let err = LifeboatError::UnsupportedContentType("application/json".into());
        assert_eq!(err.status_code(), 415);
        assert_eq!(
            err.to_string(),
            "Content type \"application/json\" not supported"
        );
    }

    #[test]
    fn mismatch_is_client_error() {
        let err = LifeboatError::FeatureCountMismatch {
            expected: 11,
            got: 3,
        };
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("expects 11, got 3"));
    }

    #[test]
    fn artifact_errors_name_the_path() {
        let err = LifeboatError::ArtifactCorrupt {
            path: PathBuf::from("/opt/ml/model/model.json"),
            reason: "expected value".into(),
        };
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("/opt/ml/model/model.json"));
    }
}
