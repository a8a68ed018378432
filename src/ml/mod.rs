//! Model adapter: CPU-only inference over persisted artifacts.
//!
//! Two artifact kinds share one contract (`predict(matrix) -> vector`):
//! a random forest and a small dense network with a sigmoid head.

pub mod dense;
pub mod forest;
pub mod model;

pub use dense::{Activation, DenseLayer, DenseNetwork};
pub use forest::{DecisionTree, RandomForest, TreeNode};
pub use model::{Classifier, Model, ModelArtifact, PredictionResult, DECISION_THRESHOLD};
