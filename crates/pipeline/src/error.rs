//! Pipeline error taxonomy

use image_preprocess::PreprocessError;
use inference_engine::InferenceError;
use serde::Serialize;
use thiserror::Error;

/// Who is responsible for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input from the caller
    ClientInput,
    /// Failure on our side
    Server,
}

/// Failures surfaced to the caller of the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image decode failed: {0}")]
    Decode(#[from] PreprocessError),
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Inference timed out after {0}ms")]
    Timeout(u64),
    #[error("Pipeline task aborted: {0}")]
    Internal(String),
    #[error("Invalid pipeline configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Decode(_) => ErrorKind::ClientInput,
            _ => ErrorKind::Server,
        }
    }

    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            PipelineError::Decode(_) => "decode",
            PipelineError::Inference(_) => "inference",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Internal(_) => "internal",
            PipelineError::Config(_) => "config",
        }
    }
}
