use thiserror::Error;

/// Current version of the watermark descriptor format.
pub const CURRENT_DESCRIPTOR_VERSION: u8 = 1;

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Invalid image dimensions: {width}x{height} cannot be decomposed over {levels} levels")]
    InvalidImageDimensions {
        width: usize,
        height: usize,
        levels: usize,
    },

    #[error("Unsupported wavelet family: {0}")]
    UnsupportedWaveletFamily(String),

    #[error("Parameter mismatch on {field}: expected {expected}, got {actual}")]
    ParameterMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl WatermarkError {
    pub(crate) fn mismatch(
        field: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::ParameterMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
