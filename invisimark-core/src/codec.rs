//! Watermark embedding and extraction for whole images.
//!
//! The codec normalizes images to single-channel canonical resolution,
//! decomposes them with the configured wavelet, and hands the target subband
//! to the block modulator. It holds no state besides its parameters; every
//! call works on its own buffers.
//!
//! # Usage
//!
//! ```no_run
//! use invisimark_core::{Payload, WatermarkCodec, WatermarkParams, Detector};
//!
//! # fn example() -> invisimark_core::Result<()> {
//! let cover = image::open("cover.png")?;
//! let codec = WatermarkCodec::new(WatermarkParams::default())?;
//!
//! let payload = Payload::token("worker42_session_2025-11-16T15:00:00Z");
//! let marked = codec.embed_watermark(&cover, &payload)?;
//! marked.image.save("marked.png")?;
//!
//! let suspect = image::open("marked.png")?;
//! let extracted = codec.extract_watermark(&suspect, &cover)?;
//! let expected = codec.payload_bits(&payload)?;
//! assert!(Detector::default().verify(&extracted, &expected).verdict);
//! # Ok(())
//! # }
//! ```

use image::{DynamicImage, GrayImage};
use tracing::{debug, info, instrument};

use crate::bits::BitSequence;
use crate::error::Result;
use crate::modulator;
use crate::params::{WatermarkDescriptor, WatermarkParams};
use crate::payload::token_to_bits_with;
use crate::plane::{normalized_plane, GrayPlane};
use crate::wavelet::{decompose, reconstruct, WaveletKind};

/// What to embed: a token hashed into bits, or bits supplied directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Token(String),
    Bits(BitSequence),
}

impl Payload {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }
}

impl From<BitSequence> for Payload {
    fn from(bits: BitSequence) -> Self {
        Self::Bits(bits)
    }
}

/// A watermarked image together with the parameters needed to read it back.
#[derive(Debug, Clone)]
pub struct Watermarked {
    pub image: GrayImage,
    pub descriptor: WatermarkDescriptor,
}

/// A reference image whose target subband has already been computed.
///
/// Useful when many suspects are checked against the same original.
#[derive(Debug, Clone)]
pub struct PreparedReference {
    params: WatermarkParams,
    subband: GrayPlane,
}

impl PreparedReference {
    pub fn params(&self) -> &WatermarkParams {
        &self.params
    }

    pub fn subband(&self) -> &GrayPlane {
        &self.subband
    }
}

/// DWT/SVD watermark codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkCodec {
    params: WatermarkParams,
}

impl Default for WatermarkCodec {
    fn default() -> Self {
        Self {
            params: WatermarkParams::default(),
        }
    }
}

impl WatermarkCodec {
    pub fn new(params: WatermarkParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Codec configured from a descriptor written at embedding time.
    pub fn from_descriptor(descriptor: &WatermarkDescriptor) -> Result<Self> {
        Self::new(descriptor.params)
    }

    pub fn params(&self) -> &WatermarkParams {
        &self.params
    }

    /// The bit sequence a payload embeds (before fitting it to capacity).
    pub fn payload_bits(&self, payload: &Payload) -> Result<BitSequence> {
        match payload {
            Payload::Token(token) => {
                self.params.validate_for_token()?;
                token_to_bits_with(self.params.digest, token, self.params.n_bits)
            }
            Payload::Bits(bits) => Ok(bits.clone()),
        }
    }

    /// Embed a payload into a cover image.
    ///
    /// The cover is converted to grayscale and resized to the canonical
    /// resolution; the returned image has that resolution. The cover itself is
    /// not modified.
    #[instrument(
        level = "debug",
        skip_all,
        fields(wavelet = %self.params.wavelet, levels = self.params.levels, alpha = self.params.alpha)
    )]
    pub fn embed_watermark(&self, cover: &DynamicImage, payload: &Payload) -> Result<Watermarked> {
        let bits = self.payload_bits(payload)?;
        let plane = normalized_plane(cover, self.params.canonical_size)?;
        let marked = self.embed_plane(&plane, &bits)?;

        let capacity = self.params.capacity();
        let carried = bits.len().min(capacity);
        let params = self.params.with_n_bits(carried);

        info!(payload_bits = carried, capacity, "Watermark embedded");

        Ok(Watermarked {
            image: marked.to_gray_image(),
            descriptor: WatermarkDescriptor::new(params, carried),
        })
    }

    /// Embed bits into an already normalized plane. Samples are not clipped.
    pub fn embed_plane(&self, plane: &GrayPlane, bits: &BitSequence) -> Result<GrayPlane> {
        let mut coefficients = decompose(plane, self.params.wavelet, self.params.levels)?;
        let target = coefficients.subband(self.params.subband)?;
        let modulated = modulator::embed(target, bits, self.params.alpha, self.params.block_size)?;
        coefficients.replace_subband(self.params.subband, modulated)?;
        Ok(reconstruct(&coefficients))
    }

    /// Recover `params.n_bits` payload bits from a suspect image.
    #[instrument(
        level = "debug",
        skip_all,
        fields(wavelet = %self.params.wavelet, levels = self.params.levels, block_size = self.params.block_size)
    )]
    pub fn extract_watermark(
        &self,
        suspect: &DynamicImage,
        reference: &DynamicImage,
    ) -> Result<BitSequence> {
        let prepared = self.prepare_reference(reference)?;
        self.extract_prepared(suspect, &prepared)
    }

    /// Like [`extract_watermark`](Self::extract_watermark), after checking that
    /// the descriptor was produced with this codec's parameters.
    pub fn extract_with_descriptor(
        &self,
        descriptor: &WatermarkDescriptor,
        suspect: &DynamicImage,
        reference: &DynamicImage,
    ) -> Result<BitSequence> {
        self.params.ensure_compatible(&descriptor.params)?;
        let prepared = self.prepare_reference(reference)?;
        let suspect = self.target_subband(&normalized_plane(suspect, self.params.canonical_size)?)?;
        modulator::extract(
            &suspect,
            &prepared.subband,
            descriptor.params.n_bits,
            self.params.block_size,
        )
    }

    /// Normalize and decompose a reference image once for repeated extraction.
    pub fn prepare_reference(&self, reference: &DynamicImage) -> Result<PreparedReference> {
        let plane = normalized_plane(reference, self.params.canonical_size)?;
        Ok(PreparedReference {
            params: self.params,
            subband: self.target_subband(&plane)?,
        })
    }

    /// Extract bits from a suspect using a prepared reference.
    ///
    /// Fails with a parameter mismatch if the reference was prepared by a codec
    /// with different block alignment.
    pub fn extract_prepared(
        &self,
        suspect: &DynamicImage,
        reference: &PreparedReference,
    ) -> Result<BitSequence> {
        self.params.ensure_compatible(&reference.params)?;
        let plane = normalized_plane(suspect, self.params.canonical_size)?;
        let subband = self.target_subband(&plane)?;
        let bits = modulator::extract(
            &subband,
            &reference.subband,
            self.params.n_bits,
            self.params.block_size,
        )?;
        debug!(extracted = bits.len(), "Extracted payload bits");
        Ok(bits)
    }

    /// Extract bits from already normalized planes.
    pub fn extract_planes(&self, suspect: &GrayPlane, reference: &GrayPlane) -> Result<BitSequence> {
        let suspect = self.target_subband(suspect)?;
        let reference = self.target_subband(reference)?;
        modulator::extract(&suspect, &reference, self.params.n_bits, self.params.block_size)
    }

    fn target_subband(&self, plane: &GrayPlane) -> Result<GrayPlane> {
        let coefficients = decompose(plane, self.params.wavelet, self.params.levels)?;
        Ok(coefficients.subband(self.params.subband)?.clone())
    }
}

/// Embed a payload with explicit alpha, wavelet and level count.
///
/// All other parameters take their defaults.
pub fn embed_watermark(
    cover: &DynamicImage,
    payload: &Payload,
    alpha: f64,
    wavelet: WaveletKind,
    levels: usize,
) -> Result<GrayImage> {
    let params = WatermarkParams::default()
        .with_alpha(alpha)
        .with_wavelet(wavelet)
        .with_levels(levels);
    Ok(WatermarkCodec::new(params)?
        .embed_watermark(cover, payload)?
        .image)
}

/// Extract `n_bits_expected` bits with explicit wavelet, level count and block size.
///
/// These must match the values used when embedding; nothing here can detect a
/// mismatch. Prefer [`WatermarkCodec::extract_with_descriptor`].
pub fn extract_watermark(
    suspect: &DynamicImage,
    reference: &DynamicImage,
    n_bits_expected: usize,
    wavelet: WaveletKind,
    levels: usize,
    block_size: usize,
) -> Result<BitSequence> {
    let params = WatermarkParams::default()
        .with_n_bits(n_bits_expected)
        .with_wavelet(wavelet)
        .with_levels(levels)
        .with_block_size(block_size);
    WatermarkCodec::new(params)?.extract_watermark(suspect, reference)
}
