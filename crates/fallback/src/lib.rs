//! Stub Fallback Classification
//!
//! Provides a constant classification when ML inference is unavailable, so
//! callers always receive a complete response.

mod stub;

pub use stub::{FallbackConfig, FallbackEngine};

use thiserror::Error;

/// Invalid fallback configuration
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Fallback confidence {0} outside [0, 1]")]
    InvalidConfidence(f32),
    #[error("Fallback label is empty")]
    EmptyLabel,
}
