//! Treatment Resolution
//!
//! Maps canonical disease names to a severity and ordered remediation steps.
//! Unknown names resolve to a defined default rather than an error.

mod resolver;
mod severity;
mod table;

pub use resolver::{TreatmentResolver, FALLBACK_INSTRUCTION};
pub use severity::Severity;
pub use table::{TreatmentInfo, TreatmentTable};

use thiserror::Error;

/// Errors loading a treatment table
#[derive(Debug, Error)]
pub enum TreatmentError {
    #[error("Failed to read treatment table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid treatment table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Treatment for {0:?} has no steps")]
    EmptySteps(String),
    #[error("Unrecognized severity {0:?}")]
    UnknownSeverity(String),
}
