use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub invoker: InvokerConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the inference endpoint
    pub host: String,
    /// Bind port (SageMaker-style containers expect 8080)
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Discrete 0/1 class label per row
    #[default]
    Labels,
    /// Positive-class probability per row
    Probabilities,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the model artifact (SM_MODEL_DIR when hosted)
    pub dir: PathBuf,
    /// Artifact file name inside `dir`
    pub file_name: String,
    /// What the invocation route returns per row
    #[serde(default)]
    pub output: OutputMode,
}

impl ModelConfig {
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvokerConfig {
    /// Identifier of the deployed inference endpoint
    pub endpoint_name: String,
    /// Base URL the invoker forwards to (`/invocations` is appended)
    pub endpoint_url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_invoker_timeout")]
    pub timeout_ms: u64,
}

fn default_invoker_timeout() -> u64 {
    10_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    DenseNetwork,
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random_forest" | "forest" | "rf" => Ok(Self::RandomForest),
            "dense_network" | "mlp" | "network" => Ok(Self::DenseNetwork),
            other => Err(format!("unknown model kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Directory holding the training CSV (SM_CHANNEL_TRAIN when hosted)
    pub data_dir: PathBuf,
    pub train_file: String,
    /// Name of the 0/1 target column
    pub label_column: String,
    #[serde(default)]
    pub model_kind: ModelKind,

    // === Random forest ===
    pub n_estimators: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,

    // === Dense network ===
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub learning_rate: f64,

    pub seed: u64,
}

impl TrainingConfig {
    pub fn train_path(&self) -> PathBuf {
        self.data_dir.join(&self.train_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Optional directory for a daily rolling log file
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("model.dir", "/opt/ml/model")?
            .set_default("model.file_name", "model.json")?
            .set_default("model.output", "labels")?
            .set_default("invoker.endpoint_name", "your-endpoint-name")?
            .set_default("invoker.endpoint_url", "http://127.0.0.1:8080")?
            .set_default("invoker.timeout_ms", 10_000)?
            .set_default("training.data_dir", "/opt/ml/input/data/train")?
            .set_default("training.train_file", "train.csv")?
            .set_default("training.label_column", "Survived")?
            .set_default("training.model_kind", "random_forest")?
            .set_default("training.n_estimators", 10)?
            .set_default("training.min_samples_split", 2)?
            .set_default("training.hidden_layers", vec![16])?
            .set_default("training.epochs", 200)?
            .set_default("training.learning_rate", 0.01)?
            .set_default("training.seed", 42)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LIFEBOAT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LIFEBOAT_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("LIFEBOAT")
                    .separator("__")
                    .try_parsing(true),
            )
            // Hosting environment wins over everything else
            .set_override_option("model.dir", std::env::var("SM_MODEL_DIR").ok())?
            .set_override_option("training.data_dir", std::env::var("SM_CHANNEL_TRAIN").ok())?
            .set_override_option(
                "invoker.endpoint_name",
                std::env::var("SAGEMAKER_ENDPOINT_NAME").ok(),
            )?;

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.model.file_name.trim().is_empty() {
            errors.push("model.file_name must not be empty".to_string());
        }
        if self.invoker.endpoint_name.trim().is_empty() {
            errors.push("invoker.endpoint_name must not be empty".to_string());
        }
        if self.training.n_estimators == 0 {
            errors.push("training.n_estimators must be > 0".to_string());
        }
        if self.training.min_samples_split < 2 {
            errors.push("training.min_samples_split must be >= 2".to_string());
        }
        if self.training.hidden_layers.iter().any(|w| *w == 0) {
            errors.push("training.hidden_layers widths must be > 0".to_string());
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            errors.push("training.learning_rate must be finite and > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.model.output, OutputMode::Labels);
        assert_eq!(cfg.training.n_estimators, 10);
        assert_eq!(cfg.training.hidden_layers, vec![16]);
        assert_eq!(cfg.training.label_column, "Survived");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_toml_overrides_builtins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[model]\nfile_name = \"forest.json\"\noutput = \"probabilities\"\n\n[server]\nport = 9090\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.model.output, OutputMode::Probabilities);
        assert!(cfg.model.artifact_path().ends_with("forest.json"));
    }

    #[test]
    fn model_kind_parses_aliases() {
        assert_eq!("mlp".parse::<ModelKind>().unwrap(), ModelKind::DenseNetwork);
        assert_eq!("Random_Forest".parse::<ModelKind>().unwrap(), ModelKind::RandomForest);
        assert!("svm".parse::<ModelKind>().is_err());
    }
}
