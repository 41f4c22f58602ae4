//! Leaf Image Preprocessing
//!
//! Decodes uploaded photographs and turns them into fixed-size tensors with
//! every channel value scaled into [0, 1].

mod error;
mod normalizer;
mod tensor;

pub use error::PreprocessError;
pub use normalizer::{ImagePreprocessor, PreprocessConfig, ResizeFilter};
pub use tensor::{NormalizedTensor, RawImage, CHANNELS};
