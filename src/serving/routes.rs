use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::LifeboatError;
use crate::ml::PredictionResult;
use crate::serving::service::InferenceService;

pub fn create_router(service: Arc<InferenceService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/invocations", post(invocations_handler))
        .with_state(service)
        .layer(cors)
}

/// Error rendered as `{"error": "..."}` with the variant's status code.
pub struct ApiError(LifeboatError);

impl From<LifeboatError> for ApiError {
    fn from(err: LifeboatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// GET /ping -- liveness
async fn ping_handler() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// POST /invocations -- CSV body in, JSON array of predictions out
async fn invocations_handler(
    State(service): State<Arc<InferenceService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let request_id = Uuid::new_v4();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match service.handle(&body, content_type) {
        Ok(prediction) => {
            info!(
                request_id = %request_id,
                content_type,
                rows = prediction.len(),
                "invocation served"
            );
            Ok(Json(prediction))
        }
        Err(e) => {
            error!(request_id = %request_id, content_type, error = %e, "invocation failed");
            Err(e.into())
        }
    }
}
