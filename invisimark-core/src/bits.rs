//! Bounded bit sequences used as watermark payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatermarkError};

/// Ordered sequence of 0/1 values.
///
/// Every element is guaranteed to be either `0` or `1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct BitSequence(Vec<u8>);

impl BitSequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a sequence of `len` zero bits.
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// Build a sequence from raw `u8` values, rejecting anything other than 0 or 1.
    pub fn from_u8_slice(values: &[u8]) -> Result<Self> {
        if let Some((index, value)) = values.iter().enumerate().find(|(_, &v)| v > 1) {
            return Err(WatermarkError::InvalidParameter(format!(
                "bit {index} has value {value}, expected 0 or 1"
            )));
        }
        Ok(Self(values.to_vec()))
    }

    /// Unpack bytes into bits, most significant bit first.
    pub fn from_bytes_msb(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
            .collect();
        Self(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bit at `index`, if present.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().map(|&b| b == 1)
    }

    pub fn push(&mut self, bit: bool) {
        self.0.push(u8::from(bit));
    }

    /// Resize with saturation: truncate when longer than `len`, zero-pad when shorter.
    ///
    /// This is how payloads are fitted to the capacity of a subband. It never fails.
    pub fn resized(&self, len: usize) -> Self {
        let mut bits = self.0.clone();
        bits.resize(len, 0);
        Self(bits)
    }

    /// First `len` bits (or all of them when shorter).
    pub fn truncated(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Number of differing positions over the common prefix of both sequences.
    pub fn hamming_distance(&self, other: &Self) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Pack into bytes, most significant bit first, zero-padding the final byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        bits_to_bytes(self)
    }

    /// Packed bytes as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl FromIterator<bool> for BitSequence {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().map(u8::from).collect())
    }
}

impl TryFrom<Vec<u8>> for BitSequence {
    type Error = WatermarkError;

    fn try_from(values: Vec<u8>) -> Result<Self> {
        Self::from_u8_slice(&values)
    }
}

impl From<BitSequence> for Vec<u8> {
    fn from(bits: BitSequence) -> Self {
        bits.0
    }
}

impl fmt::Display for BitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.0 {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

/// Pack bits into bytes, most significant bit first.
///
/// A trailing partial byte is padded with zero bits on the right.
pub fn bits_to_bytes(bits: &BitSequence) -> Vec<u8> {
    bits.as_slice()
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | (bit << (7 - i)))
        })
        .collect()
}
