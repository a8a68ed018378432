use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::ModelKind;

#[derive(Parser)]
#[command(name = "lifeboat")]
#[command(version)]
#[command(about = "Titanic survival classifier: train, serve and invoke", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml + environment overlay)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve /ping and /invocations over HTTP
    Serve {
        /// Bind host (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Model artifact path (overrides model.dir/model.file_name)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Fit a model on a labelled CSV and write the artifact
    Train {
        /// Training CSV (overrides training.data_dir/training.train_file)
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// random_forest | dense_network
        #[arg(short, long)]
        kind: Option<ModelKind>,
        /// Artifact output path (overrides model.dir/model.file_name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Forward one event to a deployed endpoint and print the envelope
    Invoke {
        /// Event JSON, e.g. '{"data": [3,0,22.0,1,0,7.25,0,1,0,0,0]}'
        #[arg(short, long, conflicts_with = "event_file")]
        event: Option<String>,
        /// File holding the event JSON
        #[arg(long)]
        event_file: Option<PathBuf>,
        /// Endpoint base URL (overrides invoker.endpoint_url)
        #[arg(long, env = "LIFEBOAT_ENDPOINT_URL")]
        endpoint_url: Option<String>,
        /// Endpoint identifier (overrides invoker.endpoint_name)
        #[arg(long)]
        endpoint_name: Option<String>,
    },
}

/// Event used when `invoke` is given none: one passenger, 11 features.
pub const SAMPLE_EVENT: &str = r#"{"data": [3, 0, 22.0, 1, 0, 7.25, 0, 1, 0, 0, 0]}"#;

/// Event JSON for `invoke`: inline text, a file, or [`SAMPLE_EVENT`].
pub fn load_event(event: Option<&str>, event_file: Option<&Path>) -> Result<serde_json::Value> {
    let raw = match (event, event_file) {
        (Some(e), _) => e.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event file {}", path.display()))?,
        (None, None) => SAMPLE_EVENT.to_string(),
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_train_kind() {
        let cli = Cli::parse_from(["lifeboat", "train", "--kind", "mlp", "--out", "m.json"]);
        match cli.command {
            Commands::Train { kind, out, data } => {
                assert_eq!(kind, Some(ModelKind::DenseNetwork));
                assert_eq!(out, Some(PathBuf::from("m.json")));
                assert!(data.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["lifeboat", "serve", "--port", "9000", "--config", "/etc/lb"]);
        assert_eq!(cli.config, PathBuf::from("/etc/lb"));
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000), .. }));
    }

    #[test]
    fn event_and_event_file_conflict() {
        let res = Cli::try_parse_from([
            "lifeboat",
            "invoke",
            "--event",
            "{}",
            "--event-file",
            "e.json",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn load_event_sources() {
        let inline = load_event(Some(r#"{"body": "1,2"}"#), None).unwrap();
        assert_eq!(inline["body"], "1,2");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"data": [1, 2]}"#).unwrap();
        let from_file = load_event(None, Some(&path)).unwrap();
        assert_eq!(from_file["data"][1], 2);

        let sample = load_event(None, None).unwrap();
        assert_eq!(sample["data"].as_array().unwrap().len(), 11);
    }

    #[test]
    fn missing_event_file_surfaces_as_other_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err: crate::error::LifeboatError = load_event(None, Some(&path)).unwrap_err().into();
        assert!(matches!(err, crate::error::LifeboatError::Other(_)));
        assert!(err.to_string().contains("failed to read event file"));

        assert!(load_event(Some("{not json"), None).is_err());
    }

    #[test]
    fn sample_event_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(SAMPLE_EVENT).unwrap();
        assert_eq!(v["data"].as_array().unwrap().len(), 11);
    }
}
