//! Model registry: load once at startup, serve read-only afterwards

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use ndarray::Array4;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::model::{Model, OnnxModel, TensorLayout};
use crate::worker::InferenceWorker;
use crate::{InferenceError, ModelLoadError};

/// How concurrent callers reach the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Callers invoke the model directly and concurrently
    #[default]
    Shared,
    /// Calls queue through a single worker that owns the model
    Serialized,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Model artifact path; `None` runs in fallback mode
    pub path: Option<PathBuf>,
    /// Square input size the model was trained on
    pub input_size: u32,
    /// Input axis order
    pub layout: TensorLayout,
    /// Concurrency policy
    pub access: AccessPolicy,
    /// Pending request capacity for the serialized worker
    pub queue_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: None,
            input_size: 256,
            layout: TensorLayout::Nhwc,
            access: AccessPolicy::Shared,
            queue_depth: 32,
        }
    }
}

/// Whether a model is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Available,
    Unavailable,
}

/// Why the registry has no model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// No artifact path configured
    NotConfigured,
    /// Configured path does not exist
    NotFound(String),
    /// Artifact exists but could not be loaded
    LoadFailed(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NotConfigured => write!(f, "no model path configured"),
            UnavailableReason::NotFound(path) => write!(f, "model not found at {}", path),
            UnavailableReason::LoadFailed(msg) => write!(f, "model load failed: {}", msg),
        }
    }
}

enum Slot {
    Shared(Arc<dyn Model>),
    Serialized {
        worker: InferenceWorker,
        name: String,
    },
    Unavailable(UnavailableReason),
}

/// Owns the process-lifetime classifier.
///
/// Built once at startup; never reloads. A failed load leaves the registry
/// `Unavailable` instead of returning an error.
pub struct ModelRegistry {
    slot: Slot,
    input_size: u32,
    layout: TensorLayout,
}

impl ModelRegistry {
    /// Load the configured artifact, degrading to `Unavailable` on any failure
    pub fn load(config: &RegistryConfig) -> Self {
        let Some(path) = &config.path else {
            warn!("No model path configured, serving fallback predictions");
            return Self::unavailable(UnavailableReason::NotConfigured, config);
        };

        if !path.exists() {
            let err = ModelLoadError::NotFound(path.display().to_string());
            warn!("{}, serving fallback predictions", err);
            return Self::unavailable(
                UnavailableReason::NotFound(path.display().to_string()),
                config,
            );
        }

        match OnnxModel::load(path, config.input_size, config.layout) {
            Ok(model) => Self::with_model(Arc::new(model), config),
            Err(e) => {
                error!("Failed to load model {}: {}", path.display(), e);
                Self::unavailable(UnavailableReason::LoadFailed(e.to_string()), config)
            }
        }
    }

    /// Register an already constructed model
    pub fn with_model(model: Arc<dyn Model>, config: &RegistryConfig) -> Self {
        let slot = match config.access {
            AccessPolicy::Shared => Slot::Shared(model),
            AccessPolicy::Serialized => {
                let name = model.name().to_string();
                match InferenceWorker::spawn(model, config.queue_depth) {
                    Ok(worker) => Slot::Serialized { worker, name },
                    Err(e) => {
                        error!("{}", e);
                        Slot::Unavailable(UnavailableReason::LoadFailed(e.to_string()))
                    }
                }
            }
        };

        if let Slot::Shared(_) | Slot::Serialized { .. } = slot {
            info!(
                "Model registry ready ({:?} access, {}x{} input)",
                config.access, config.input_size, config.input_size
            );
        }

        Self {
            slot,
            input_size: config.input_size,
            layout: config.layout,
        }
    }

    /// A registry with no model
    pub fn unavailable(reason: UnavailableReason, config: &RegistryConfig) -> Self {
        Self {
            slot: Slot::Unavailable(reason),
            input_size: config.input_size,
            layout: config.layout,
        }
    }

    /// Current mode
    pub fn status(&self) -> ModelStatus {
        match self.slot {
            Slot::Unavailable(_) => ModelStatus::Unavailable,
            _ => ModelStatus::Available,
        }
    }

    /// Reason for `Unavailable`, if so
    pub fn unavailable_reason(&self) -> Option<&UnavailableReason> {
        match &self.slot {
            Slot::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }

    /// Loaded model name
    pub fn model_name(&self) -> Option<&str> {
        match &self.slot {
            Slot::Shared(model) => Some(model.name()),
            Slot::Serialized { name, .. } => Some(name),
            Slot::Unavailable(_) => None,
        }
    }

    /// Square input size the model expects
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Input axis order the model expects
    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    /// Run a forward pass off the async executor
    pub async fn forward(&self, batch: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        match &self.slot {
            Slot::Shared(model) => {
                let model = Arc::clone(model);
                tokio::task::spawn_blocking(move || model.forward(batch))
                    .await
                    .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?
            }
            Slot::Serialized { worker, .. } => worker.submit(batch).await,
            Slot::Unavailable(_) => Err(InferenceError::ModelUnavailable),
        }
    }

    /// Release the model and stop any worker thread
    pub fn teardown(self) {
        match self.slot {
            Slot::Serialized { worker, name } => {
                worker.shutdown();
                info!("Model {} released", name);
            }
            Slot::Shared(model) => info!("Model {} released", model.name()),
            Slot::Unavailable(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(Vec<f32>);

    impl Model for FixedModel {
        fn forward(&self, _batch: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_no_path_is_not_configured() {
        let registry = ModelRegistry::load(&RegistryConfig::default());
        assert_eq!(registry.status(), ModelStatus::Unavailable);
        assert_eq!(
            registry.unavailable_reason(),
            Some(&UnavailableReason::NotConfigured)
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let config = RegistryConfig {
            path: Some(PathBuf::from("/nonexistent/leaf_model.onnx")),
            ..Default::default()
        };
        let registry = ModelRegistry::load(&config);
        assert_eq!(registry.status(), ModelStatus::Unavailable);
        assert!(matches!(
            registry.unavailable_reason(),
            Some(UnavailableReason::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_load_failed() {
        let path = std::env::temp_dir().join(format!("corrupt-{}.onnx", std::process::id()));
        std::fs::write(&path, [0xde, 0xad, 0xbe, 0xef]).unwrap();
        let config = RegistryConfig {
            path: Some(path.clone()),
            input_size: 8,
            ..Default::default()
        };

        let registry = ModelRegistry::load(&config);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            registry.unavailable_reason(),
            Some(UnavailableReason::LoadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_forward_errors() {
        let registry = ModelRegistry::load(&RegistryConfig::default());
        let result = registry.forward(Array4::zeros((1, 2, 2, 3))).await;
        assert!(matches!(result, Err(InferenceError::ModelUnavailable)));
    }

    #[tokio::test]
    async fn test_shared_and_serialized_forward() {
        for access in [AccessPolicy::Shared, AccessPolicy::Serialized] {
            let config = RegistryConfig {
                access,
                ..Default::default()
            };
            let registry = ModelRegistry::with_model(Arc::new(FixedModel(vec![0.1, 0.9])), &config);
            assert_eq!(registry.status(), ModelStatus::Available);
            assert_eq!(registry.model_name(), Some("fixed"));

            let output = registry.forward(Array4::zeros((1, 2, 2, 3))).await.unwrap();
            assert_eq!(output, vec![0.1, 0.9]);
            registry.teardown();
        }
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            UnavailableReason::NotFound("m.onnx".into()).to_string(),
            "model not found at m.onnx"
        );
        assert_eq!(
            UnavailableReason::NotConfigured.to_string(),
            "no model path configured"
        );
    }
}
