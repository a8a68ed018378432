//! Request pipeline: decode -> normalize -> predict.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::OutputMode;
use crate::error::{LifeboatError, Result};
use crate::ml::{Model, PredictionResult};
use crate::payload::{decode, normalize};

/// Inference pipeline around a model loaded once at startup.
///
/// Failure policy:
/// - unsupported content type is returned as an error;
/// - a body that cannot be decoded into a matrix is logged and answered
///   with [`PredictionResult::fallback`] (`[0]`) instead of an error;
/// - model errors (feature count mismatch) are returned as errors.
#[derive(Debug, Clone)]
pub struct InferenceService {
    model: Arc<Model>,
    output: OutputMode,
}

impl InferenceService {
    pub fn new(model: Arc<Model>, output: OutputMode) -> Self {
        Self { model, output }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    pub fn handle(&self, body: &[u8], content_type: &str) -> Result<PredictionResult> {
        let matrix = match decode(body, content_type).and_then(normalize) {
            Ok(m) => m,
            Err(e @ LifeboatError::UnsupportedContentType(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, body_len = body.len(), "payload decode failed; returning default prediction");
                return Ok(PredictionResult::fallback());
            }
        };

        debug!(rows = matrix.n_rows(), cols = matrix.n_cols(), "decoded payload");
        self.model.predict_with(&matrix, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{DecisionTree, ModelArtifact, RandomForest, TreeNode};

    fn service(output: OutputMode) -> InferenceService {
        // Survives iff the second feature is above 0.5.
        let forest = RandomForest {
            n_features: 3,
            trees: vec![DecisionTree::new(vec![
                TreeNode::split(1, 0.5, 1, 2),
                TreeNode::leaf(0.2),
                TreeNode::leaf(0.8),
            ])],
            metadata: serde_json::Value::Null,
        };
        let model = Model::new(ModelArtifact::RandomForest(forest)).unwrap();
        InferenceService::new(Arc::new(model), output)
    }

    #[test]
    fn one_label_per_row() {
        let out = service(OutputMode::Labels)
            .handle(b"0,0,0\n0,1,0\n0,1,0\n", "text/csv")
            .unwrap();
        assert_eq!(out, PredictionResult::Labels(vec![0, 1, 1]));
    }

    #[test]
    fn flat_body_is_one_sample() {
        let out = service(OutputMode::Labels).handle(b"0,1,0", "text/csv").unwrap();
        assert_eq!(out, PredictionResult::Labels(vec![1]));
    }

    #[test]
    fn probabilities_mode() {
        let out = service(OutputMode::Probabilities)
            .handle(b"0,0,0", "text/csv")
            .unwrap();
        assert_eq!(out, PredictionResult::Probabilities(vec![0.2]));
    }

    #[test]
    fn malformed_csv_soft_fails_to_default() {
        let svc = service(OutputMode::Labels);
        for body in [&b"0,abc,0"[..], &b""[..], &b"1,2,3\n4,5\n"[..]] {
            assert_eq!(
                svc.handle(body, "text/csv").unwrap(),
                PredictionResult::fallback()
            );
        }
        // Fallback is a label even when probabilities are configured.
        assert_eq!(
            service(OutputMode::Probabilities)
                .handle(b"x", "text/csv")
                .unwrap(),
            PredictionResult::Labels(vec![0])
        );
    }

    #[test]
    fn unsupported_content_type_is_hard_error() {
        let err = service(OutputMode::Labels)
            .handle(b"garbage", "application/json")
            .unwrap_err();
        assert!(matches!(err, LifeboatError::UnsupportedContentType(_)));
    }

    #[test]
    fn wrong_width_is_hard_error() {
        let err = service(OutputMode::Labels)
            .handle(b"1,2", "text/csv")
            .unwrap_err();
        assert!(matches!(err, LifeboatError::FeatureCountMismatch { .. }));
    }
}
