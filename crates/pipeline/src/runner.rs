//! Pipeline orchestration

use std::sync::Arc;
use std::time::Duration;

use fallback::FallbackEngine;
use image_preprocess::{ImagePreprocessor, PreprocessConfig, RawImage, ResizeFilter};
use inference_engine::{ClassificationResult, Classifier, ModelRegistry, ModelStatus, UnavailableReason};
use serde::{Deserialize, Serialize};
use storage::{DiseaseMetadata, DiseaseMetadataSource};
use taxonomy::{LabelMapper, Vocabulary, VocabularyKind};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use treatment::TreatmentResolver;

use crate::error::PipelineError;
use crate::outcome::{InferenceOutcome, InferencePath};
use crate::stage::Stage;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default end-to-end deadline for one request
    pub deadline_ms: u64,
    /// Resampling filter used by preprocessing
    pub resize_filter: ResizeFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 10_000,
            resize_filter: ResizeFilter::Triangle,
        }
    }
}

/// Snapshot of the pipeline's mode for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct PipelineHealth {
    pub model_status: ModelStatus,
    pub unavailable_reason: Option<UnavailableReason>,
    pub model_name: Option<String>,
    pub vocabulary: VocabularyKind,
    pub vocabulary_size: usize,
    pub input_size: u32,
}

/// Tracks the current stage of one invocation
struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {} -> {}",
            self.stage,
            next
        );
        debug!("Pipeline stage {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// Preprocess, classify (or fall back), then resolve treatment and metadata.
///
/// The preprocessor and classifier are bound to the registry's input size
/// and the same vocabulary at construction, so they cannot drift apart.
pub struct InferencePipeline {
    preprocessor: ImagePreprocessor,
    registry: Arc<ModelRegistry>,
    classifier: Classifier,
    mapper: LabelMapper,
    resolver: TreatmentResolver,
    metadata: Arc<dyn DiseaseMetadataSource>,
    fallback: FallbackEngine,
    config: PipelineConfig,
}

impl InferencePipeline {
    pub fn new(
        registry: Arc<ModelRegistry>,
        vocabulary: Arc<Vocabulary>,
        resolver: TreatmentResolver,
        metadata: Arc<dyn DiseaseMetadataSource>,
        fallback: FallbackEngine,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let preprocessor = ImagePreprocessor::new(PreprocessConfig {
            target_size: registry.input_size(),
            filter: config.resize_filter,
        })
        .map_err(|e| PipelineError::Config(e.to_string()))?;

        info!(
            "Inference pipeline ready: model {:?}, {} labels ({:?}), deadline {}ms",
            registry.status(),
            vocabulary.len(),
            vocabulary.kind(),
            config.deadline_ms
        );

        Ok(Self {
            preprocessor,
            classifier: Classifier::new(Arc::clone(&vocabulary)),
            mapper: LabelMapper::new(vocabulary),
            registry,
            resolver,
            metadata,
            fallback,
            config,
        })
    }

    /// Classify with the configured default deadline
    pub async fn classify(&self, image: RawImage) -> Result<InferenceOutcome, PipelineError> {
        let deadline = Duration::from_millis(self.config.deadline_ms);
        self.classify_with_deadline(image, deadline).await
    }

    /// Classify one image within `deadline`.
    ///
    /// With no model loaded this never fails: the stub result is resolved
    /// without touching the image.
    pub async fn classify_with_deadline(
        &self,
        image: RawImage,
        deadline: Duration,
    ) -> Result<InferenceOutcome, PipelineError> {
        let start = Instant::now();
        let expires = start + deadline;

        let result = self.run(image, deadline, expires, start).await;

        let latency_ms = start.elapsed().as_millis() as u64;
        metrics::histogram!("leafscan_inference_latency_ms").record(latency_ms as f64);
        match &result {
            Ok(outcome) => {
                let path = match outcome.path {
                    InferencePath::Model => "model",
                    InferencePath::Fallback => "fallback",
                };
                metrics::counter!("leafscan_inference_total", "path" => path).increment(1);
            }
            Err(e) => {
                warn!("Inference failed after {}ms: {}", latency_ms, e);
                metrics::counter!("leafscan_inference_errors_total", "kind" => e.label()).increment(1);
            }
        }
        result
    }

    async fn run(
        &self,
        image: RawImage,
        deadline: Duration,
        expires: Instant,
        start: Instant,
    ) -> Result<InferenceOutcome, PipelineError> {
        let mut stage = StageTracker::new();
        let deadline_ms = deadline.as_millis() as u64;

        let (classification, path) = match self.registry.status() {
            ModelStatus::Unavailable => {
                stage.advance(Stage::FallbackClassifying);
                (self.fallback.classify(), InferencePath::Fallback)
            }
            ModelStatus::Available => {
                stage.advance(Stage::Preprocessing);
                let preprocessor = self.preprocessor.clone();
                let tensor = timeout_at(
                    expires,
                    tokio::task::spawn_blocking(move || preprocessor.normalize(&image)),
                )
                .await
                .map_err(|_| PipelineError::Timeout(deadline_ms))?
                .map_err(|e| PipelineError::Internal(e.to_string()))??;

                stage.advance(Stage::Classifying);
                let result = timeout_at(expires, self.classifier.classify(&self.registry, tensor))
                    .await
                    .map_err(|_| PipelineError::Timeout(deadline_ms))??;
                (result, InferencePath::Model)
            }
        };

        stage.advance(Stage::Resolving);
        let outcome = self.resolve(classification, path, expires, start).await;
        stage.advance(Stage::Done);
        Ok(outcome)
    }

    async fn resolve(
        &self,
        classification: ClassificationResult,
        path: InferencePath,
        expires: Instant,
        start: Instant,
    ) -> InferenceOutcome {
        let disease = self.mapper.map(&classification.raw_label);
        let treatment = self.resolver.resolve(&disease.clean_name);
        let metadata = self.lookup_metadata(&disease.clean_name, expires).await;

        let (localized_name, symptoms) = match metadata {
            Some(record) => (record.localized_name, record.symptoms),
            None => (None, None),
        };

        InferenceOutcome {
            clean_disease_name: disease.clean_name,
            raw_label: classification.raw_label,
            class_index: classification.class_index,
            confidence: classification.confidence,
            severity: treatment.severity,
            treatment_steps: treatment.steps,
            localized_name,
            symptoms,
            crop: disease.crop,
            path,
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Metadata is optional enrichment: failures and timeouts count as a miss
    async fn lookup_metadata(&self, name: &str, expires: Instant) -> Option<DiseaseMetadata> {
        match timeout_at(expires, self.metadata.lookup(name)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!("Metadata lookup for {:?} failed: {}", name, e);
                None
            }
            Err(_) => {
                warn!("Metadata lookup for {:?} timed out", name);
                None
            }
        }
    }

    pub fn model_status(&self) -> ModelStatus {
        self.registry.status()
    }

    pub fn unavailable_reason(&self) -> Option<&UnavailableReason> {
        self.registry.unavailable_reason()
    }

    pub fn health(&self) -> PipelineHealth {
        let vocabulary = self.mapper.vocabulary();
        PipelineHealth {
            model_status: self.registry.status(),
            unavailable_reason: self.registry.unavailable_reason().cloned(),
            model_name: self.registry.model_name().map(str::to_string),
            vocabulary: vocabulary.kind(),
            vocabulary_size: vocabulary.len(),
            input_size: self.registry.input_size(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
