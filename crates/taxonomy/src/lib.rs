//! Disease Taxonomy
//!
//! Label vocabularies a classifier can be bound to, and the mapping from a
//! dataset-specific raw label to a canonical disease name.

mod mapper;
mod vocabulary;

pub use mapper::{CanonicalDisease, LabelMapper, CROP_SEPARATOR};
pub use vocabulary::{Vocabulary, VocabularyKind, COARSE_LABELS, PLANT_VILLAGE_LABELS, UNKNOWN_LABEL};

use thiserror::Error;

/// Errors building a vocabulary
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Failed to read label file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Vocabulary is empty")]
    Empty,
    #[error("Duplicate label {0:?}")]
    Duplicate(String),
    #[error("File vocabulary selected but no labels path configured")]
    MissingPath,
}
