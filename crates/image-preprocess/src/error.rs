//! Preprocessing Error Types

use thiserror::Error;

/// Errors while turning raw bytes into a tensor
#[derive(Debug, Clone, Error)]
pub enum PreprocessError {
    /// Bytes are not a valid or supported image encoding
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// Declared content type is not an image type
    #[error("Declared content type {0:?} is not an image")]
    NotAnImage(String),

    /// Tensor construction rejected the pixel data
    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    /// Preprocessor configured with an unusable target size
    #[error("Invalid target size: {0}")]
    InvalidTargetSize(u32),
}
