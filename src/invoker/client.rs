use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{LifeboatError, Result};

/// Transport to a deployed inference endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EndpointClient: Send + Sync {
    /// Send `body` to `endpoint` and return the raw response text.
    async fn invoke_endpoint(&self, endpoint: &str, content_type: &str, body: String)
        -> Result<String>;
}

/// Posts to `<base_url>/invocations` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEndpointClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEndpointClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn invocations_url(&self) -> String {
        format!("{}/invocations", self.base_url)
    }
}

#[async_trait]
impl EndpointClient for HttpEndpointClient {
    async fn invoke_endpoint(
        &self,
        endpoint: &str,
        content_type: &str,
        body: String,
    ) -> Result<String> {
        let url = self.invocations_url();
        debug!(endpoint, url = %url, "forwarding payload");

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| LifeboatError::UpstreamInvocationFailure(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| LifeboatError::UpstreamInvocationFailure(e.to_string()))?;

        if !status.is_success() {
            return Err(LifeboatError::UpstreamInvocationFailure(format!(
                "endpoint {endpoint} returned {status}: {text}"
            )));
        }
        Ok(text)
    }
}
