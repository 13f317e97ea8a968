//! Block-wise singular value modulation.
//!
//! A subband is flattened row-major and cut into consecutive blocks of
//! `block_size` samples. Each block carries one payload bit: the block is
//! viewed as a matrix (square when `block_size` is a perfect square, a single
//! row otherwise) and its dominant singular value is shifted by `+alpha` for a
//! `1` bit or `-alpha` for a `0` bit.
//!
//! Extraction is non-blind: the same blocks are taken from the suspect and the
//! reference subband, and a bit is `1` when the suspect's dominant singular
//! value exceeds the reference's.

use nalgebra::DMatrix;
use tracing::debug;

use crate::bits::BitSequence;
use crate::error::{Result, WatermarkError};
use crate::plane::GrayPlane;

/// Matrix view of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// `side`×`side` matrix, for perfect-square block sizes.
    Square(usize),
    /// `1`×`len` row vector.
    Row(usize),
}

impl BlockShape {
    pub fn for_block_size(block_size: usize) -> Self {
        let side = (block_size as f64).sqrt().round() as usize;
        if side * side == block_size {
            Self::Square(side)
        } else {
            Self::Row(block_size)
        }
    }

    /// `(rows, columns)`
    pub fn dims(&self) -> (usize, usize) {
        match *self {
            Self::Square(side) => (side, side),
            Self::Row(len) => (1, len),
        }
    }
}

/// Number of blocks (and therefore payload bits) a subband of `len` samples holds.
pub fn capacity(len: usize, block_size: usize) -> usize {
    if block_size == 0 {
        0
    } else {
        len / block_size
    }
}

fn validate(block_size: usize, alpha: Option<f64>) -> Result<()> {
    if block_size == 0 {
        return Err(WatermarkError::InvalidParameter(
            "block size must be positive".into(),
        ));
    }
    if let Some(alpha) = alpha {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(WatermarkError::InvalidParameter(format!(
                "alpha must be a finite non-negative number, got {alpha}"
            )));
        }
    }
    Ok(())
}

/// Embed `bits` into `subband`, one bit per block.
///
/// The payload is resized to the subband's capacity first: extra bits are
/// dropped and missing bits are embedded as zeros. Samples after the last
/// whole block are left untouched.
pub fn embed(
    subband: &GrayPlane,
    bits: &BitSequence,
    alpha: f64,
    block_size: usize,
) -> Result<GrayPlane> {
    validate(block_size, Some(alpha))?;

    let block_count = capacity(subband.len(), block_size);
    let payload = bits.resized(block_count);
    let shape = BlockShape::for_block_size(block_size);

    debug!(
        block_count,
        payload_bits = bits.len(),
        block_size,
        ?shape,
        alpha,
        "Embedding payload into subband"
    );

    let mut output = subband.clone();
    let samples = output.as_mut_slice();
    for (i, bit) in payload.iter().enumerate() {
        let delta = if bit { alpha } else { -alpha };
        let block = &mut samples[i * block_size..(i + 1) * block_size];
        perturb_dominant(block, shape, delta);
    }

    Ok(output)
}

/// Recover up to `n_bits_expected` bits by comparing suspect and reference blocks.
///
/// The result holds `min(n_bits_expected, capacity)` bits; a shorter result than
/// requested means the subband cannot carry the full payload.
pub fn extract(
    suspect: &GrayPlane,
    reference: &GrayPlane,
    n_bits_expected: usize,
    block_size: usize,
) -> Result<BitSequence> {
    validate(block_size, None)?;
    if suspect.shape() != reference.shape() {
        return Err(WatermarkError::mismatch(
            "subband shape",
            format!("{:?}", reference.shape()),
            format!("{:?}", suspect.shape()),
        ));
    }

    let block_count = capacity(suspect.len(), block_size);
    let count = n_bits_expected.min(block_count);
    let shape = BlockShape::for_block_size(block_size);

    let bits: BitSequence = suspect
        .as_slice()
        .chunks_exact(block_size)
        .zip(reference.as_slice().chunks_exact(block_size))
        .take(count)
        .map(|(s, r)| dominant_singular_value(s, shape) - dominant_singular_value(r, shape) > 0.0)
        .collect();

    if count < n_bits_expected {
        debug!(
            requested = n_bits_expected,
            available = count,
            "Subband holds fewer blocks than requested bits"
        );
    }

    Ok(bits)
}

/// Largest singular value of a block.
pub fn dominant_singular_value(block: &[f64], shape: BlockShape) -> f64 {
    match shape {
        // A single row has one singular value: its Euclidean norm.
        BlockShape::Row(_) => block.iter().map(|v| v * v).sum::<f64>().sqrt(),
        BlockShape::Square(side) => DMatrix::from_row_slice(side, side, block)
            .singular_values()
            .iter()
            .copied()
            .fold(0.0, f64::max),
    }
}

/// Shift the dominant singular value of `block` by `delta`, in place.
///
/// With `B = U diag(S) Vᵗ`, adding `delta` to `S[0]` is the rank-one update
/// `B + delta * u0 * v0ᵗ`. An all-zero block has no defined singular vectors;
/// the first basis vectors are used, so the update lands on its first sample.
fn perturb_dominant(block: &mut [f64], shape: BlockShape, delta: f64) {
    let norm = block.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        block[0] += delta;
        return;
    }

    match shape {
        BlockShape::Row(_) => {
            // u0 = [1], v0 = row / |row|
            let scale = (norm + delta) / norm;
            block.iter_mut().for_each(|v| *v *= scale);
        }
        BlockShape::Square(side) => {
            let matrix = DMatrix::from_row_slice(side, side, block);
            let svd = matrix.svd(true, true);
            let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
                return;
            };
            let k = svd
                .singular_values
                .iter()
                .enumerate()
                .fold((0, f64::MIN), |best, (i, &s)| if s > best.1 { (i, s) } else { best })
                .0;
            let update = u.column(k) * v_t.row(k) * delta;
            for r in 0..side {
                for c in 0..side {
                    block[r * side + c] += update[(r, c)];
                }
            }
        }
    }
}
