//! Leaf Disease Inference Pipeline
//!
//! One call turns uploaded bytes into a diagnosis with treatment advice:
//!
//! ```text
//! Idle -> Preprocessing -> Classifying ---------> Resolving -> Done
//! Idle -> FallbackClassifying (no model loaded) -> Resolving -> Done
//! ```

mod error;
mod outcome;
mod runner;
mod stage;

pub use error::{ErrorKind, PipelineError};
pub use outcome::{InferenceOutcome, InferencePath};
pub use runner::{InferencePipeline, PipelineConfig, PipelineHealth};
pub use stage::Stage;

pub use image_preprocess::RawImage;
pub use inference_engine::{ModelStatus, UnavailableReason};
