//! Health Route

use axum::{extract::State, Json};
use inference_engine::{ModelStatus, UnavailableReason};
use serde::Serialize;
use std::sync::Arc;
use taxonomy::VocabularyKind;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` with a model, `degraded` when serving fallback predictions
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelHealth,
}

/// Model component health
#[derive(Debug, Serialize)]
pub struct ModelHealth {
    pub status: ModelStatus,
    pub reason: Option<UnavailableReason>,
    pub name: Option<String>,
    pub vocabulary: VocabularyKind,
    pub vocabulary_size: usize,
    pub input_size: u32,
}

/// Service and model status
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.pipeline.health();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let status = match health.model_status {
        ModelStatus::Available => "ok",
        ModelStatus::Unavailable => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: ModelHealth {
            status: health.model_status,
            reason: health.unavailable_reason,
            name: health.model_name,
            vocabulary: health.vocabulary,
            vocabulary_size: health.vocabulary_size,
            input_size: health.input_size,
        },
    })
}
