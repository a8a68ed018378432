//! Offline training job. Produces the artifact the serving path loads;
//! nothing else is shared with serving.

pub mod dataset;
pub mod forest;
pub mod network;

pub use dataset::Dataset;
pub use forest::{fit_forest, ForestParams};
pub use network::{fit_network, NetworkFit, NetworkParams};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{ModelKind, TrainingConfig};
use crate::error::Result;
use crate::ml::{Model, ModelArtifact};

/// Summary of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub kind: ModelKind,
    pub n_samples: usize,
    pub n_features: usize,
    pub train_accuracy: f64,
    pub artifact_path: PathBuf,
}

pub struct TrainingJob {
    config: TrainingConfig,
}

impl TrainingJob {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Load the configured training CSV, fit, and write the artifact.
    pub fn run(&self, data_path: &Path, artifact_path: &Path) -> Result<TrainReport> {
        info!(data = %data_path.display(), "loading training data");
        let ds = Dataset::from_path(data_path, &self.config.label_column)?;
        self.run_on(&ds, artifact_path)
    }

    pub fn run_on(&self, ds: &Dataset, artifact_path: &Path) -> Result<TrainReport> {
        let cfg = &self.config;
        info!(
            kind = ?cfg.model_kind,
            n_samples = ds.n_samples(),
            n_features = ds.n_features(),
            positive_rate = ds.positive_rate(),
            "fitting model"
        );

        let mut metadata = json!({
            "trained_at": Utc::now().to_rfc3339(),
            "n_samples": ds.n_samples(),
            "label_column": cfg.label_column,
            "feature_names": ds.feature_names,
            "seed": cfg.seed,
        });

        let artifact = match cfg.model_kind {
            ModelKind::RandomForest => {
                let params = ForestParams {
                    n_estimators: cfg.n_estimators,
                    max_depth: cfg.max_depth,
                    min_samples_split: cfg.min_samples_split,
                    max_features: None,
                    seed: cfg.seed,
                };
                let mut forest = fit_forest(ds, &params)?;
                metadata["n_estimators"] = json!(cfg.n_estimators);
                forest.metadata = metadata;
                ModelArtifact::RandomForest(forest)
            }
            ModelKind::DenseNetwork => {
                let params = NetworkParams {
                    hidden_layers: cfg.hidden_layers.clone(),
                    epochs: cfg.epochs,
                    learning_rate: cfg.learning_rate,
                    seed: cfg.seed,
                };
                let NetworkFit {
                    mut network,
                    final_loss,
                } = fit_network(ds, &params)?;
                metadata["epochs"] = json!(cfg.epochs);
                metadata["final_loss"] = json!(final_loss);
                network.metadata = metadata;
                ModelArtifact::DenseNetwork(network)
            }
        };

        let model = Model::new(artifact)?;
        let predicted = model.predict(&ds.features)?;
        let correct = predicted
            .iter()
            .zip(&ds.labels)
            .filter(|(p, y)| p == y)
            .count();
        let train_accuracy = correct as f64 / ds.n_samples() as f64;

        let artifact_path = model.save(artifact_path)?;
        info!(
            artifact = %artifact_path.display(),
            train_accuracy,
            "model artifact written"
        );

        Ok(TrainReport {
            kind: cfg.model_kind,
            n_samples: ds.n_samples(),
            n_features: ds.n_features(),
            train_accuracy,
            artifact_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    const TRAIN: &str = "\
Survived,Pclass,Sex,Age,Fare
0,3,0,22,7.25
1,1,1,38,71.28
1,3,1,26,7.92
1,1,1,35,53.1
0,3,0,35,8.05
0,3,0,,8.46
0,1,0,54,51.86
0,3,0,2,21.07
1,3,1,27,11.13
1,2,1,14,30.07
";

    fn training_config(kind: ModelKind) -> TrainingConfig {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::load_from(dir.path()).unwrap().training;
        cfg.model_kind = kind;
        cfg
    }

    #[test]
    fn trains_and_writes_loadable_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("train.csv");
        std::fs::write(&data, TRAIN).unwrap();

        for kind in [ModelKind::RandomForest, ModelKind::DenseNetwork] {
            let out = dir.path().join(format!("{kind:?}.json"));
            let report = TrainingJob::new(training_config(kind))
                .run(&data, &out)
                .unwrap();

            assert_eq!(report.n_samples, 10);
            assert_eq!(report.n_features, 4);
            assert!(report.train_accuracy > 0.5);

            let model = Model::load(&out).unwrap();
            assert_eq!(model.n_features(), 4);
        }
    }

    #[test]
    fn artifact_records_training_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::from_reader(TRAIN.as_bytes(), "Survived").unwrap();
        let out = dir.path().join("model.json");
        TrainingJob::new(training_config(ModelKind::RandomForest))
            .run_on(&ds, &out)
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(raw["kind"], "random_forest");
        assert_eq!(raw["metadata"]["label_column"], "Survived");
        assert_eq!(raw["metadata"]["feature_names"][3], "Fare");
        assert_eq!(raw["metadata"]["n_estimators"], 10);
    }
}
