//! Constant stub classification

use inference_engine::ClassificationResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::FallbackError;

/// Stub classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Raw label reported by the stub
    pub label: String,
    /// Class index reported by the stub
    pub class_index: usize,
    /// Confidence reported by the stub
    pub confidence: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            label: "Apple___Apple_scab".to_string(),
            class_index: 0,
            confidence: 0.98,
        }
    }
}

/// Produces the stub classification used in `Unavailable` mode
#[derive(Debug, Clone)]
pub struct FallbackEngine {
    config: FallbackConfig,
}

impl FallbackEngine {
    /// Validate the stub settings
    pub fn new(config: FallbackConfig) -> Result<Self, FallbackError> {
        if !(0.0..=1.0).contains(&config.confidence) {
            return Err(FallbackError::InvalidConfidence(config.confidence));
        }
        if config.label.trim().is_empty() {
            return Err(FallbackError::EmptyLabel);
        }
        Ok(Self { config })
    }

    /// The constant classification
    pub fn classify(&self) -> ClassificationResult {
        info!("Using stub fallback: {}", self.config.label);
        ClassificationResult {
            raw_label: self.config.label.clone(),
            class_index: self.config.class_index,
            confidence: self.config.confidence,
            latency_ms: 0,
        }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_stub() {
        let engine = FallbackEngine::new(FallbackConfig::default()).unwrap();
        let result = engine.classify();
        assert_eq!(result.raw_label, "Apple___Apple_scab");
        assert_eq!(result.class_index, 0);
        assert!((result.confidence - 0.98).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stub_is_constant() {
        let engine = FallbackEngine::new(FallbackConfig::default()).unwrap();
        assert_eq!(engine.classify(), engine.classify());
    }

    #[test]
    fn test_rejects_empty_label() {
        let config = FallbackConfig {
            label: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(FallbackEngine::new(config), Err(FallbackError::EmptyLabel)));
    }

    proptest! {
        #[test]
        fn prop_confidence_outside_unit_interval_rejected(confidence in prop_oneof![-10.0f32..-0.001, 1.001f32..10.0]) {
            let config = FallbackConfig { confidence, ..Default::default() };
            prop_assert!(FallbackEngine::new(config).is_err());
        }
    }
}
