//! Treatment lookup table

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::severity::Severity;
use crate::TreatmentError;

/// Severity plus ordered remediation steps for one disease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentInfo {
    pub severity: Severity,
    pub steps: Vec<String>,
}

impl TreatmentInfo {
    pub fn new<I, S>(severity: Severity, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            severity,
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }
}

/// Immutable map from canonical disease name to treatment
#[derive(Debug, Clone, Default)]
pub struct TreatmentTable {
    entries: HashMap<String, TreatmentInfo>,
}

impl TreatmentTable {
    /// Reference table shipped with the service
    pub fn seeded() -> Self {
        let entries = [
            (
                "Apple scab",
                TreatmentInfo::new(
                    Severity::Medium,
                    ["Remove infected leaves.", "Apply Mancozeb 75% WP @ 2g/liter."],
                ),
            ),
            (
                "Black rot",
                TreatmentInfo::new(Severity::High, ["Prune dead wood.", "Apply Captan or Thiram."]),
            ),
            (
                "healthy",
                TreatmentInfo::new(Severity::Low, ["Continue regular care and monitoring."]),
            ),
            (
                "Healthy",
                TreatmentInfo::new(
                    Severity::Low,
                    [
                        "Continue regular monitoring",
                        "Maintain proper irrigation",
                        "Ensure balanced fertilization",
                    ],
                ),
            ),
            (
                "Wheat Rust",
                TreatmentInfo::new(
                    Severity::High,
                    [
                        "Apply fungicides like Tebuconazole or Propiconazole",
                        "Remove and destroy infected plant parts",
                        "Plant resistant varieties in future seasons",
                        "Avoid overhead irrigation to reduce moisture on leaves",
                    ],
                ),
            ),
            (
                "Potato Blight",
                TreatmentInfo::new(
                    Severity::High,
                    [
                        "Apply copper-based fungicides",
                        "Improve air circulation between plants",
                        "Remove infected leaves immediately",
                        "Avoid watering in the evening",
                    ],
                ),
            ),
            (
                "Corn Common Smut",
                TreatmentInfo::new(
                    Severity::Medium,
                    [
                        "Remove galls before they rupture",
                        "Avoid mechanical injury to plants",
                        "Maintain balanced nitrogen levels",
                        "Rotate crops",
                    ],
                ),
            ),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|(name, info)| (name.to_string(), info))
                .collect(),
        }
    }

    /// Parse a JSON object of `{ "<name>": { "severity": ..., "steps": [...] } }`
    pub fn from_json_str(json: &str) -> Result<Self, TreatmentError> {
        let entries: HashMap<String, TreatmentInfo> = serde_json::from_str(json)?;
        if let Some((name, _)) = entries.iter().find(|(_, info)| info.steps.is_empty()) {
            return Err(TreatmentError::EmptySteps(name.clone()));
        }
        Ok(Self { entries })
    }

    /// Load a JSON table from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TreatmentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TreatmentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json_str(&json)?;
        info!("Loaded {} treatments from {}", table.len(), path.display());
        Ok(table)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&TreatmentInfo> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
