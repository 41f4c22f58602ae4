//! Model abstraction and the tract-backed ONNX implementation

use std::path::Path;
use std::time::Instant;

use ndarray::Array4;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::{InferenceError, ModelLoadError};

/// Axis order the model expects for its single image input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// [batch, height, width, channel] (Keras exports)
    #[default]
    Nhwc,
    /// [batch, channel, height, width] (PyTorch exports)
    Nchw,
}

impl TensorLayout {
    /// Input shape for a batch of one square image
    pub fn batch_shape(&self, size: usize) -> [usize; 4] {
        match self {
            TensorLayout::Nhwc => [1, size, size, 3],
            TensorLayout::Nchw => [1, 3, size, size],
        }
    }
}

/// A loaded classifier.
///
/// `forward` takes `&self` and implementations must tolerate concurrent
/// calls. A runtime that cannot should be registered with
/// [`crate::AccessPolicy::Serialized`].
pub trait Model: Send + Sync {
    /// Run one forward pass and return the first output, flattened
    fn forward(&self, batch: Array4<f32>) -> Result<Vec<f32>, InferenceError>;

    /// Short description for logs and health output
    fn name(&self) -> &str;
}

type Plan = TypedRunnableModel<TypedModel>;

/// ONNX classifier executed with tract
pub struct OnnxModel {
    plan: Plan,
    input_shape: [usize; 4],
    name: String,
}

impl OnnxModel {
    /// Parse, pin the input shape, optimize and plan the model at `path`
    pub fn load(path: &Path, input_size: u32, layout: TensorLayout) -> Result<Self, ModelLoadError> {
        let start = Instant::now();
        let input_shape = layout.batch_shape(input_size as usize);

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?
            .with_input_fact(0, f32::fact(input_shape).into())
            .map_err(|e| ModelLoadError::Parse(e.to_string()))?
            .into_optimized()
            .map_err(|e| ModelLoadError::Optimize(e.to_string()))?
            .into_runnable()
            .map_err(|e| ModelLoadError::Optimize(e.to_string()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(
            "Model {} loaded in {:.2}ms (input {:?})",
            name,
            start.elapsed().as_secs_f64() * 1000.0,
            input_shape
        );

        Ok(Self {
            plan,
            input_shape,
            name,
        })
    }
}

impl Model for OnnxModel {
    fn forward(&self, batch: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        if batch.shape() != self.input_shape {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{:?}", self.input_shape),
                actual: format!("{:?}", batch.shape()),
            });
        }

        let batch = batch.as_standard_layout();
        let data = batch.as_slice().ok_or_else(|| {
            InferenceError::InferenceFailed("input tensor is not contiguous".to_string())
        })?;
        let input = Tensor::from_shape(&self.input_shape, data)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::InvalidOutput("model produced no outputs".to_string()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?;

        debug!("Model output shape {:?}", view.shape());
        Ok(view.iter().copied().collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
