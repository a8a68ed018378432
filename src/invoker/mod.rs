//! Endpoint invoker: reshapes a client event into a CSV payload, forwards
//! it to a deployed inference endpoint and wraps the answer in a
//! gateway-style envelope. It never returns an error to its caller; every
//! failure becomes a 400 or 500 envelope.

pub mod client;
pub mod event;

pub use client::{EndpointClient, HttpEndpointClient};
pub use event::InvocationEvent;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::payload::CSV_CONTENT_TYPE;

/// Gateway-style response. `body` is a JSON document encoded as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl InvokerResponse {
    pub fn ok(body: &Value) -> Self {
        let headers = BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ]);
        Self {
            status_code: 200,
            body: body.to_string(),
            headers: Some(headers),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status_code: 400,
            body: json!({ "error": message }).to_string(),
            headers: None,
        }
    }

    pub fn server_error(message: &str) -> Self {
        Self {
            status_code: 500,
            body: json!({
                "error": message,
                "message": "Failed to invoke inference endpoint",
            })
            .to_string(),
            headers: None,
        }
    }

    /// Decoded `body`, if it is valid JSON.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

pub struct Invoker {
    client: Arc<dyn EndpointClient>,
    endpoint_name: String,
}

impl Invoker {
    pub fn new(client: Arc<dyn EndpointClient>, endpoint_name: impl Into<String>) -> Self {
        Self {
            client,
            endpoint_name: endpoint_name.into(),
        }
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub async fn invoke(&self, event: &Value) -> InvokerResponse {
        let payload = match InvocationEvent::from_value(event).and_then(InvocationEvent::into_csv) {
            Ok(p) => p,
            Err(e) => {
                info!(error = %e, "rejected invocation event");
                return InvokerResponse::bad_request(&e.to_string());
            }
        };

        info!(endpoint = %self.endpoint_name, payload = %payload, "invoking endpoint");

        let raw = match self
            .client
            .invoke_endpoint(&self.endpoint_name, CSV_CONTENT_TYPE, payload)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!(endpoint = %self.endpoint_name, error = %e, "endpoint invocation failed");
                return InvokerResponse::server_error(&e.to_string());
            }
        };

        // Non-JSON answers are passed back as plain text.
        let prediction = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
        info!(endpoint = %self.endpoint_name, prediction = %prediction, "prediction received");

        InvokerResponse::ok(&json!({
            "prediction": prediction,
            "endpoint": self.endpoint_name,
        }))
    }
}
