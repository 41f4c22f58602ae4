//! Arg-max classification over the bound vocabulary

use std::sync::Arc;
use std::time::Instant;

use image_preprocess::NormalizedTensor;
use ndarray::{Array4, Axis};
use serde::{Deserialize, Serialize};
use taxonomy::Vocabulary;
use tracing::{debug, info, warn};

use crate::model::TensorLayout;
use crate::registry::ModelRegistry;
use crate::InferenceError;

/// Top class of one forward pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Vocabulary label, or `Unknown` when the index is not covered
    pub raw_label: String,
    /// Position of the maximum probability
    pub class_index: usize,
    /// Probability of that class, in [0, 1]
    pub confidence: f32,
    /// Forward pass latency
    pub latency_ms: u64,
}

/// Runs tensors through the registry's model and picks the top class
#[derive(Debug, Clone)]
pub struct Classifier {
    vocabulary: Arc<Vocabulary>,
}

impl Classifier {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Bound vocabulary
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Classify one tensor with the registry's model
    pub async fn classify(
        &self,
        registry: &ModelRegistry,
        tensor: NormalizedTensor,
    ) -> Result<ClassificationResult, InferenceError> {
        let expected = registry.input_size() as usize;
        if tensor.size() != expected {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{}x{}x3", expected, expected),
                actual: format!("{:?}", tensor.dim()),
            });
        }

        let start = Instant::now();
        let batch = to_batch(tensor, registry.layout());
        let probabilities = registry.forward(batch).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let mut result = self.reduce(&probabilities)?;
        result.latency_ms = latency_ms;

        info!(
            "Inference: {} ({:.2}%) in {}ms",
            result.raw_label,
            result.confidence * 100.0,
            latency_ms
        );
        Ok(result)
    }

    /// Arg-max over a probability vector.
    ///
    /// Ties resolve to the lowest index. The winning probability is clamped
    /// into [0, 1] but otherwise reported as-is.
    pub fn reduce(&self, probabilities: &[f32]) -> Result<ClassificationResult, InferenceError> {
        if probabilities.is_empty() {
            return Err(InferenceError::InvalidOutput("empty probability vector".to_string()));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(InferenceError::InvalidOutput(format!(
                "non-finite probability {}",
                bad
            )));
        }
        if probabilities.len() != self.vocabulary.len() {
            warn!(
                "Model emits {} classes but vocabulary has {}",
                probabilities.len(),
                self.vocabulary.len()
            );
        }

        let mut class_index = 0;
        let mut best = probabilities[0];
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            if p > best {
                best = p;
                class_index = i;
            }
        }

        if !(0.0..=1.0).contains(&best) {
            debug!("Clamping out-of-range confidence {}", best);
        }

        Ok(ClassificationResult {
            raw_label: self.vocabulary.label(class_index).to_string(),
            class_index,
            confidence: best.clamp(0.0, 1.0),
            latency_ms: 0,
        })
    }
}

/// Add the leading batch axis and reorder for the model's layout
pub(crate) fn to_batch(tensor: NormalizedTensor, layout: TensorLayout) -> Array4<f32> {
    let batch = tensor.into_array().insert_axis(Axis(0));
    match layout {
        TensorLayout::Nhwc => batch,
        TensorLayout::Nchw => batch.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned(),
    }
}
