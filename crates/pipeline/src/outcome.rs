//! Externally visible pipeline result

use serde::{Deserialize, Serialize};
use treatment::Severity;

/// Which branch produced the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferencePath {
    Model,
    Fallback,
}

/// Diagnosis plus treatment for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub clean_disease_name: String,
    pub raw_label: String,
    pub class_index: usize,
    pub confidence: f32,
    pub severity: Severity,
    pub treatment_steps: Vec<String>,
    pub localized_name: Option<String>,
    pub symptoms: Option<String>,
    pub crop: Option<String>,
    pub path: InferencePath,
    pub latency_ms: u64,
}
