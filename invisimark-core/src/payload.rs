//! Token-derived watermark payloads.
//!
//! A payload is derived from an identifying token (for example a worker session
//! string) by hashing its UTF-8 bytes with a 256-bit digest and unpacking the
//! digest bytes most significant bit first.
//!
//! # Usage
//!
//! ```
//! use invisimark_core::payload::token_to_bits;
//!
//! let bits = token_to_bits("worker42_session_2025-11-16T15:00:00Z", 128).unwrap();
//! assert_eq!(bits.len(), 128);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

use crate::bits::BitSequence;
use crate::error::{Result, WatermarkError};

/// Digest size in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Maximum number of payload bits a single digest can provide.
pub const MAX_PAYLOAD_BITS: usize = DIGEST_SIZE * 8;

/// Digest family used to derive payload bits from a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256, the reference choice for cross-implementation test vectors.
    #[default]
    Sha256,
    /// SHA3-256.
    Sha3_256,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha3_256 => "sha3-256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha3-256" | "sha3_256" | "sha3" => Ok(Self::Sha3_256),
            other => Err(WatermarkError::InvalidParameter(format!(
                "unknown digest algorithm: {other}"
            ))),
        }
    }
}

/// Hash a token with the selected digest.
pub fn token_digest(algorithm: DigestAlgorithm, token: &str) -> [u8; DIGEST_SIZE] {
    let mut digest = [0u8; DIGEST_SIZE];
    match algorithm {
        DigestAlgorithm::Sha256 => digest.copy_from_slice(&Sha256::digest(token.as_bytes())),
        DigestAlgorithm::Sha3_256 => digest.copy_from_slice(&Sha3_256::digest(token.as_bytes())),
    }
    digest
}

/// Derive `n_bits` payload bits from a token using SHA-256.
///
/// Requests for more than [`MAX_PAYLOAD_BITS`] bits are rejected.
pub fn token_to_bits(token: &str, n_bits: usize) -> Result<BitSequence> {
    token_to_bits_with(DigestAlgorithm::Sha256, token, n_bits)
}

/// Derive `n_bits` payload bits from a token using the given digest.
pub fn token_to_bits_with(
    algorithm: DigestAlgorithm,
    token: &str,
    n_bits: usize,
) -> Result<BitSequence> {
    if n_bits > MAX_PAYLOAD_BITS {
        return Err(WatermarkError::InvalidParameter(format!(
            "requested {n_bits} payload bits, a {algorithm} digest provides {MAX_PAYLOAD_BITS}"
        )));
    }

    let digest = token_digest(algorithm, token);
    Ok(BitSequence::from_bytes_msb(&digest).truncated(n_bits))
}
