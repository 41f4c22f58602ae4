//! Leaf Classifier Inference Engine
//!
//! Loads an ONNX classifier once, exposes whether it is available, and
//! reduces its probability output to a single labelled class.

mod classifier;
mod model;
mod registry;
mod worker;

pub use classifier::{ClassificationResult, Classifier};
pub use model::{Model, OnnxModel, TensorLayout};
pub use registry::{AccessPolicy, ModelRegistry, ModelStatus, RegistryConfig, UnavailableReason};
pub use worker::InferenceWorker;

use thiserror::Error;

/// Errors during a forward pass
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("No model loaded")]
    ModelUnavailable,
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
    #[error("Inference worker stopped")]
    WorkerStopped,
}

/// Errors loading the model artifact at startup
#[derive(Debug, Clone, Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {0}")]
    NotFound(String),
    #[error("Model parse failed: {0}")]
    Parse(String),
    #[error("Model optimization failed: {0}")]
    Optimize(String),
    #[error("Inference worker failed to start: {0}")]
    Worker(String),
}
