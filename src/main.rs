use clap::Parser;
use lifeboat::cli::{load_event, Cli, Commands};
use lifeboat::config::AppConfig;
use lifeboat::error::{LifeboatError, Result};
use lifeboat::invoker::{HttpEndpointClient, Invoker};
use lifeboat::logging::{init_logging, init_logging_simple};
use lifeboat::ml::Model;
use lifeboat::serving::{InferenceServer, InferenceService};
use lifeboat::training::TrainingJob;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        return Err(LifeboatError::Validation(errors.join("; ")));
    }

    match cli.command {
        Commands::Serve { host, port, model } => {
            init_logging(&config.logging);
            run_serve(&config, host, port, model).await
        }
        Commands::Train { data, kind, out } => {
            init_logging(&config.logging);
            run_train(&config, data, kind, out)
        }
        Commands::Invoke {
            event,
            event_file,
            endpoint_url,
            endpoint_name,
        } => {
            init_logging_simple();
            run_invoke(&config, event, event_file, endpoint_url, endpoint_name).await
        }
    }
}

async fn run_serve(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
    model_path: Option<PathBuf>,
) -> Result<()> {
    let model_path = model_path.unwrap_or_else(|| config.model.artifact_path());

    // Loaded once; every request reuses it read-only.
    let model = match Model::load(&model_path) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!(model_path = %model_path.display(), error = %e, "cannot start without a model");
            return Err(e);
        }
    };

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| LifeboatError::Validation(format!("invalid bind address {host}:{port}: {e}")))?;

    let service = Arc::new(InferenceService::new(model, config.model.output));
    InferenceServer::new(service, addr).run().await
}

fn run_train(
    config: &AppConfig,
    data: Option<PathBuf>,
    kind: Option<lifeboat::config::ModelKind>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut training = config.training.clone();
    if let Some(kind) = kind {
        training.model_kind = kind;
    }
    let data = data.unwrap_or_else(|| training.train_path());
    let out = out.unwrap_or_else(|| config.model.artifact_path());

    let report = TrainingJob::new(training).run(&data, &out)?;
    info!(
        kind = ?report.kind,
        n_samples = report.n_samples,
        train_accuracy = report.train_accuracy,
        "training complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_invoke(
    config: &AppConfig,
    event: Option<String>,
    event_file: Option<PathBuf>,
    endpoint_url: Option<String>,
    endpoint_name: Option<String>,
) -> Result<()> {
    let event = load_event(event.as_deref(), event_file.as_deref())?;

    let url = endpoint_url.unwrap_or_else(|| config.invoker.endpoint_url.clone());
    let name = endpoint_name.unwrap_or_else(|| config.invoker.endpoint_name.clone());
    let client = HttpEndpointClient::new(&url, Duration::from_millis(config.invoker.timeout_ms))?;

    let response = Invoker::new(Arc::new(client), name).invoke(&event).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
