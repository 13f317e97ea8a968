//! Invisimark Core - invisible watermarking for grayscale images
//!
//! This crate embeds a deterministic, token-derived bit payload into the
//! wavelet domain of an image and recovers it later from a possibly
//! re-encoded copy, given the unmodified original.
//!
//! # Features
//!
//! - Payload bits derived from a token with SHA-256 (SHA3-256 optional)
//! - Multi-level orthogonal wavelet pyramid (Haar, Daubechies 2-4)
//! - One bit per block via dominant singular value perturbation
//! - Non-blind extraction against a reference image
//! - Bit-error-rate detection with a configurable threshold
//! - Parameter descriptors (CBOR/JSON) that travel with watermarked images
//!
//! # Example
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use invisimark_core::{Detector, Payload, WatermarkCodec, WatermarkParams};
//!
//! # fn main() -> invisimark_core::Result<()> {
//! let cover = DynamicImage::ImageLuma8(GrayImage::from_fn(128, 128, |x, y| {
//!     Luma([(96.0 + 60.0 * ((x as f64) * 0.8).sin() * ((y as f64) * 1.2).cos()) as u8])
//! }));
//!
//! let codec = WatermarkCodec::new(WatermarkParams::default().with_canonical_size(128))?;
//! let payload = Payload::token("worker42_session_2025-11-16T15:00:00Z");
//! let marked = codec.embed_watermark(&cover, &payload)?;
//!
//! let suspect = DynamicImage::ImageLuma8(marked.image);
//! let extracted = codec.extract_with_descriptor(&marked.descriptor, &suspect, &cover)?;
//! let expected = codec.payload_bits(&payload)?;
//!
//! let result = Detector::default().verify(&extracted, &expected);
//! println!("BER {:.3}, detected: {}", result.ber, result.verdict);
//! # Ok(())
//! # }
//! ```

pub mod bits;
pub mod codec;
pub mod detector;
pub mod error;
pub mod modulator;
pub mod params;
pub mod payload;
pub mod plane;
pub mod wavelet;

// Re-export main types for convenience
pub use bits::{bits_to_bytes, BitSequence};
pub use codec::{
    embed_watermark, extract_watermark, Payload, PreparedReference, WatermarkCodec, Watermarked,
};
pub use detector::{verify, DetectionResult, Detector, DEFAULT_THRESHOLD};
pub use error::{Result, WatermarkError, CURRENT_DESCRIPTOR_VERSION};
pub use params::{WatermarkDescriptor, WatermarkParams};
pub use payload::{token_to_bits, token_to_bits_with, DigestAlgorithm, MAX_PAYLOAD_BITS};
pub use plane::{GrayPlane, CANONICAL_SIZE};
pub use wavelet::{Orientation, SubbandId, WaveletCoefficients, WaveletKind};
