//! Raw input and normalized tensor types

use ndarray::{Array3, ArrayView3};

use crate::PreprocessError;

/// Number of color channels in every tensor
pub const CHANNELS: usize = 3;

/// Uploaded image bytes with the content type the transport declared
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl RawImage {
    /// Wrap raw bytes and their declared MIME type
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Raw encoded bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Number of encoded bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no bytes were supplied
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Square RGB tensor laid out height x width x channel, values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array3<f32>,
}

impl NormalizedTensor {
    /// Build a tensor from an existing array.
    ///
    /// The array must be square in its spatial dimensions, carry exactly
    /// three channels and hold only values in [0, 1].
    pub fn from_array(data: Array3<f32>) -> Result<Self, PreprocessError> {
        let (height, width, channels) = data.dim();
        if height == 0 || height != width || channels != CHANNELS {
            return Err(PreprocessError::InvalidTensor(format!(
                "expected SxSx{} with S > 0, got {}x{}x{}",
                CHANNELS, height, width, channels
            )));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(PreprocessError::InvalidTensor(format!(
                "value {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { data })
    }

    /// Filled with a single RGB color, each component in [0, 1]
    pub fn filled(size: u32, rgb: [f32; 3]) -> Result<Self, PreprocessError> {
        let size = size as usize;
        let data = Array3::from_shape_fn((size, size, CHANNELS), |(_, _, c)| rgb[c]);
        Self::from_array(data)
    }

    pub(crate) fn from_validated(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Side length in pixels
    pub fn size(&self) -> usize {
        self.data.dim().0
    }

    /// Shape as (height, width, channels)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Borrow the underlying array
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Take ownership of the underlying array
    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// Iterate over every value in row-major order
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied()
    }
}
