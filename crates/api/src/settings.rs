//! Layered service settings: defaults, optional TOML file, environment

use std::path::PathBuf;

use fallback::{FallbackConfig, FallbackError};
use image_preprocess::ResizeFilter;
use inference_engine::{AccessPolicy, RegistryConfig, TensorLayout};
use pipeline::{PipelineConfig, PipelineError};
use serde::Deserialize;
use storage::StorageError;
use taxonomy::{VocabularyError, VocabularyKind};
use thiserror::Error;
use treatment::TreatmentError;

use crate::rate_limit::RateLimitConfig;

/// Default settings file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "leafscan.toml";
/// Environment variable naming an alternative settings file
pub const CONFIG_PATH_ENV: &str = "LEAFSCAN_CONFIG";
const ENV_PREFIX: &str = "LEAFSCAN";

/// Startup failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid settings: {0}")]
    Invalid(String),
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error(transparent)]
    Treatment(#[from] TreatmentError),
    #[error(transparent)]
    Fallback(#[from] FallbackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Logging setup failed: {0}")]
    Logging(String),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
    /// Upper bound on a detect request body
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// ONNX artifact; absent means fallback mode
    pub path: Option<PathBuf>,
    pub input_size: u32,
    pub vocabulary: VocabularyKind,
    /// Label file, required for the `file` vocabulary
    pub labels_path: Option<PathBuf>,
    pub layout: TensorLayout,
    pub access: AccessPolicy,
    pub queue_depth: usize,
    pub resize_filter: ResizeFilter,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let registry = RegistryConfig::default();
        Self {
            path: registry.path,
            input_size: registry.input_size,
            vocabulary: VocabularyKind::PlantVillage,
            labels_path: None,
            layout: registry.layout,
            access: registry.access,
            queue_depth: registry.queue_depth,
            resize_filter: ResizeFilter::Triangle,
        }
    }
}

impl ModelSettings {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            path: self.path.clone(),
            input_size: self.input_size,
            layout: self.layout,
            access: self.access,
            queue_depth: self.queue_depth,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub deadline_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline_ms: PipelineConfig::default().deadline_ms,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TreatmentSettings {
    /// JSON table replacing the built-in one
    pub table_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// SQLite URL; the seeded in-memory store is used when absent
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Complete service settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub pipeline: PipelineSettings,
    pub fallback: FallbackConfig,
    pub treatment: TreatmentSettings,
    pub metadata: MetadataSettings,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load from `LEAFSCAN_CONFIG` (or `leafscan.toml`) and the environment
    pub fn load() -> Result<Self, SettingsError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file (optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.model.input_size == 0 {
            return Err(SettingsError::Invalid("model.input_size must be positive".into()));
        }
        if self.model.vocabulary == VocabularyKind::File && self.model.labels_path.is_none() {
            return Err(SettingsError::Invalid(
                "model.labels_path is required for the file vocabulary".into(),
            ));
        }
        if self.pipeline.deadline_ms == 0 {
            return Err(SettingsError::Invalid("pipeline.deadline_ms must be positive".into()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(SettingsError::Invalid("server.max_upload_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            deadline_ms: self.pipeline.deadline_ms,
            resize_filter: self.model.resize_filter,
        }
    }
}
