//! Explicit watermark parameters and the descriptor carried with marked images.
//!
//! Embedding and extraction only pair up when they agree on the wavelet
//! family, the number of levels, the target subband, the block size and the
//! canonical resolution. [`WatermarkDescriptor`] records those choices next to
//! a watermarked image so a verifier can reuse them instead of guessing.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::detector::DEFAULT_THRESHOLD;
use crate::error::{Result, WatermarkError, CURRENT_DESCRIPTOR_VERSION};
use crate::payload::{DigestAlgorithm, MAX_PAYLOAD_BITS};
use crate::plane::CANONICAL_SIZE;
use crate::wavelet::{check_dimensions, SubbandId, WaveletKind};

pub const DEFAULT_LEVELS: usize = 2;
pub const DEFAULT_ALPHA: f64 = 1.5;
pub const DEFAULT_BLOCK_SIZE: usize = 8;
pub const DEFAULT_N_BITS: usize = 128;

/// Everything embed and extract must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatermarkParams {
    pub wavelet: WaveletKind,
    pub levels: usize,
    /// Perturbation strength added to or subtracted from each block's dominant singular value.
    pub alpha: f64,
    pub block_size: usize,
    /// Payload length in bits.
    pub n_bits: usize,
    pub subband: SubbandId,
    /// Side of the square resolution images are normalized to.
    pub canonical_size: u32,
    pub digest: DigestAlgorithm,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        Self {
            wavelet: WaveletKind::default(),
            levels: DEFAULT_LEVELS,
            alpha: DEFAULT_ALPHA,
            block_size: DEFAULT_BLOCK_SIZE,
            n_bits: DEFAULT_N_BITS,
            subband: SubbandId::WATERMARK_TARGET,
            canonical_size: CANONICAL_SIZE,
            digest: DigestAlgorithm::default(),
        }
    }
}

impl WatermarkParams {
    pub fn with_wavelet(mut self, wavelet: WaveletKind) -> Self {
        self.wavelet = wavelet;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_n_bits(mut self, n_bits: usize) -> Self {
        self.n_bits = n_bits;
        self
    }

    pub fn with_canonical_size(mut self, size: u32) -> Self {
        self.canonical_size = size;
        self
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Check the parameters are usable together.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(WatermarkError::InvalidParameter(
                "block size must be positive".into(),
            ));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(WatermarkError::InvalidParameter(format!(
                "alpha must be a finite non-negative number, got {}",
                self.alpha
            )));
        }
        if self.subband.level == 0 || self.subband.level > self.levels {
            return Err(WatermarkError::InvalidParameter(format!(
                "target {} is outside a {}-level pyramid",
                self.subband, self.levels
            )));
        }
        let size = self.canonical_size as usize;
        check_dimensions(size, size, self.levels)
    }

    /// Validate and additionally require a token-derived payload to be
    /// non-empty and to fit one digest.
    ///
    /// Extraction alone accepts `n_bits == 0` and yields an empty sequence.
    pub fn validate_for_token(&self) -> Result<()> {
        self.validate()?;
        if self.n_bits == 0 {
            return Err(WatermarkError::InvalidParameter(
                "token payload must carry at least one bit".into(),
            ));
        }
        if self.n_bits > MAX_PAYLOAD_BITS {
            return Err(WatermarkError::InvalidParameter(format!(
                "token payloads are limited to {MAX_PAYLOAD_BITS} bits, got {}",
                self.n_bits
            )));
        }
        Ok(())
    }

    /// Side length of the target subband at canonical resolution.
    pub fn target_side(&self) -> usize {
        // The coarsest level sits `levels` halvings below the input; each
        // halving rounds up. Level `l` sits `levels - l + 1` halvings below.
        let halvings = self
            .levels
            .saturating_add(1)
            .saturating_sub(self.subband.level)
            .min(usize::BITS as usize);
        (0..halvings).fold(self.canonical_size as usize, |side, _| side.div_ceil(2))
    }

    /// Number of payload bits the target subband can carry.
    pub fn capacity(&self) -> usize {
        let side = self.target_side();
        crate::modulator::capacity(side * side, self.block_size)
    }

    /// Fail with [`WatermarkError::ParameterMismatch`] on the first field that differs.
    ///
    /// `self` is treated as the expected value.
    pub fn ensure_compatible(&self, other: &Self) -> Result<()> {
        if self.wavelet != other.wavelet {
            return Err(WatermarkError::mismatch("wavelet", self.wavelet, other.wavelet));
        }
        if self.levels != other.levels {
            return Err(WatermarkError::mismatch("levels", self.levels, other.levels));
        }
        if self.subband != other.subband {
            return Err(WatermarkError::mismatch("subband", self.subband, other.subband));
        }
        if self.block_size != other.block_size {
            return Err(WatermarkError::mismatch(
                "block_size",
                self.block_size,
                other.block_size,
            ));
        }
        if self.canonical_size != other.canonical_size {
            return Err(WatermarkError::mismatch(
                "canonical_size",
                self.canonical_size,
                other.canonical_size,
            ));
        }
        if self.digest != other.digest {
            return Err(WatermarkError::mismatch("digest", self.digest, other.digest));
        }
        Ok(())
    }
}

/// Parameters describing a watermarked image, stored next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkDescriptor {
    /// Descriptor format version.
    pub version: u8,
    pub params: WatermarkParams,
    /// Blocks available in the target subband.
    pub capacity: usize,
    /// Payload bits actually carried (the rest of the capacity holds zero bits).
    pub payload_bits: usize,
    /// Suggested detection threshold.
    pub threshold: f64,
    /// Unix timestamp (milliseconds) of the embedding.
    pub embedded_at: u64,
}

impl WatermarkDescriptor {
    pub fn new(params: WatermarkParams, payload_bits: usize) -> Self {
        let capacity = params.capacity();
        Self {
            version: CURRENT_DESCRIPTOR_VERSION,
            params,
            capacity,
            payload_bits: payload_bits.min(capacity),
            threshold: DEFAULT_THRESHOLD,
            embedded_at: Utc::now().timestamp_millis() as u64,
        }
    }

    /// Serialize the descriptor to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| WatermarkError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize a descriptor from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let descriptor: Self = ciborium::from_reader(bytes)
            .map_err(|e| WatermarkError::SerializationError(e.to_string()))?;
        descriptor.check_version()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WatermarkError::SerializationError(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let descriptor: Self = serde_json::from_slice(bytes)
            .map_err(|e| WatermarkError::SerializationError(e.to_string()))?;
        descriptor.check_version()
    }

    /// Parse either encoding, trying CBOR first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_cbor(bytes).or_else(|_| Self::from_json(bytes))
    }

    fn check_version(self) -> Result<Self> {
        if self.version != CURRENT_DESCRIPTOR_VERSION {
            return Err(WatermarkError::mismatch(
                "descriptor version",
                CURRENT_DESCRIPTOR_VERSION,
                self.version,
            ));
        }
        Ok(self)
    }
}
