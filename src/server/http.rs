//! HTTP surface of the generation service.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gateway::{Delivery, Headliner};
use crate::types::{AttributeRecord, Generated};
use crate::{HeadlinerError, PKG_VERSION};

/// Body returned to callers when generation fails upstream.
pub const GENERATION_FAILED: &str = "Failed to generate personalized message";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Request body shared by both generation endpoints.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub utm_params: Option<AttributeRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Error type for HTTP handlers.
pub enum ApiError {
    BadRequest(String),
    Generation(HeadlinerError),
}

impl From<HeadlinerError> for ApiError {
    fn from(err: HeadlinerError) -> Self {
        match err {
            HeadlinerError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Generation(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Generation(err) => {
                warn!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED.to_string())
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the router over a shared service.
pub fn create_router(headliner: Arc<Headliner>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-message", post(generate_message))
        .route("/generate-message-stream", post(generate_message_stream))
        .with_state(headliner)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: PKG_VERSION,
    })
}

fn extract_record(
    body: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<AttributeRecord> {
    let Json(request) = body?;
    Ok(request.utm_params.unwrap_or_default())
}

async fn generate_message(
    State(headliner): State<Arc<Headliner>>,
    body: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<Generated>> {
    let record = extract_record(body)?;
    Ok(Json(headliner.generate(&record).await?))
}

async fn generate_message_stream(
    State(headliner): State<Arc<Headliner>>,
    body: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let record = extract_record(body)?;
    let body = match headliner.generate_stream(&record).await? {
        Delivery::Cached(message) => Body::from(message),
        Delivery::Streaming(stream) => {
            debug!(campaign = %record.describe(), "streaming response");
            Body::from_stream(stream)
        }
    };
    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response())
}
