//! Image normalization: decode, force RGB, resize, scale to [0, 1]

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tensor::{NormalizedTensor, RawImage, CHANNELS};
use crate::PreprocessError;

/// Resampling filter used when resizing to the target size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side length the model expects (square input)
    pub target_size: u32,
    /// Resampling filter
    pub filter: ResizeFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: 256,
            filter: ResizeFilter::Triangle,
        }
    }
}

/// Turns raw uploads into model-ready tensors.
///
/// Aspect ratio is not preserved: every image is stretched to
/// `target_size x target_size`.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    /// Create a preprocessor, rejecting a zero target size
    pub fn new(config: PreprocessConfig) -> Result<Self, PreprocessError> {
        if config.target_size == 0 {
            return Err(PreprocessError::InvalidTargetSize(config.target_size));
        }
        Ok(Self { config })
    }

    /// Configured side length
    pub fn target_size(&self) -> u32 {
        self.config.target_size
    }

    /// Decode and normalize an uploaded image
    pub fn normalize(&self, raw: &RawImage) -> Result<NormalizedTensor, PreprocessError> {
        let mime = raw.mime_type().trim().to_ascii_lowercase();
        if !mime.starts_with("image/") {
            return Err(PreprocessError::NotAnImage(raw.mime_type().to_string()));
        }
        if raw.is_empty() {
            return Err(PreprocessError::Decode("empty image payload".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(raw.bytes()))
            .with_guessed_format()
            .map_err(|e| PreprocessError::Decode(e.to_string()))?;

        let declared = ImageFormat::from_mime_type(&mime);
        if let (Some(declared), Some(sniffed)) = (declared, reader.format()) {
            if declared != sniffed {
                debug!(
                    "Declared {:?} but payload looks like {:?}, decoding as sniffed",
                    declared, sniffed
                );
            }
        }

        let decoded = reader
            .decode()
            .map_err(|e| PreprocessError::Decode(e.to_string()))?;
        debug!(
            "Decoded {}x{} image ({} bytes)",
            decoded.width(),
            decoded.height(),
            raw.len()
        );

        let size = self.config.target_size;
        let rgb = decoded.to_rgb8();
        let resized = imageops::resize(&rgb, size, size, self.config.filter.into());

        let side = size as usize;
        let values: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();
        let data = Array3::from_shape_vec((side, side, CHANNELS), values)
            .map_err(|e| PreprocessError::InvalidTensor(e.to_string()))?;

        Ok(NormalizedTensor::from_validated(data))
    }
}
