//! Inference endpoint: `/ping` liveness and `/invocations` prediction.

pub mod routes;
pub mod service;

pub use routes::create_router;
pub use service::InferenceService;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::error::{LifeboatError, Result};

/// HTTP server hosting one [`InferenceService`].
pub struct InferenceServer {
    service: Arc<InferenceService>,
    addr: SocketAddr,
}

impl InferenceServer {
    pub fn new(service: Arc<InferenceService>, addr: SocketAddr) -> Self {
        Self { service, addr }
    }

    /// Serve until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        self.run_on(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn run_on<F>(&self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = create_router(Arc::clone(&self.service));
        info!(
            addr = %listener.local_addr()?,
            model_kind = self.service.model().kind(),
            n_features = self.service.model().n_features(),
            "starting inference server"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| LifeboatError::Internal(format!("Inference server error: {}", e)))?;

        info!("inference server stopped");
        Ok(())
    }

    pub fn service(&self) -> Arc<InferenceService> {
        Arc::clone(&self.service)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
