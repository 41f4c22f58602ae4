//! Detection Route

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pipeline::{ErrorKind, InferenceOutcome, PipelineError, RawImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::AppState;

/// Successful detection
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub outcome: InferenceOutcome,
}

/// Failed detection
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: Uuid,
    pub error: String,
    pub message: String,
}

/// Classify the image in the request body.
///
/// The `Content-Type` header is passed through as the declared MIME type.
pub async fn post_detect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("detect", %request_id);

    async move {
        let mime = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream");
        info!("Detect request: {} bytes ({})", body.len(), mime);

        let image = RawImage::new(body.to_vec(), mime);
        match state.pipeline.classify(image).await {
            Ok(outcome) => {
                info!(
                    "Detected {} ({:?} path) in {}ms",
                    outcome.clean_disease_name, outcome.path, outcome.latency_ms
                );
                (StatusCode::OK, Json(DetectResponse { request_id, outcome })).into_response()
            }
            Err(e) => error_response(request_id, &e),
        }
    }
    .instrument(span)
    .await
}

fn error_response(request_id: Uuid, err: &PipelineError) -> Response {
    let status = status_for(err);
    warn!("Detect failed with {}: {}", status, err);
    let body = ErrorResponse {
        request_id,
        error: err.label().to_string(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

fn status_for(err: &PipelineError) -> StatusCode {
    match (err.kind(), err) {
        (ErrorKind::ClientInput, _) => StatusCode::BAD_REQUEST,
        (_, PipelineError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
