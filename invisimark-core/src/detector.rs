//! Bit-error-rate based watermark detection.

use serde::{Deserialize, Serialize};

use crate::bits::BitSequence;

/// Default BER cutoff. A watermark is detected when the BER is strictly below it.
pub const DEFAULT_THRESHOLD: f64 = 0.35;

/// Outcome of comparing extracted bits against the expected payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// `true` when `ber < threshold`.
    pub verdict: bool,
    /// Fraction of mismatched positions.
    pub ber: f64,
    /// `(1 - ber) * 100`
    pub confidence: f64,
    /// Positions compared (the shorter of the two sequences).
    pub compared: usize,
    pub mismatches: usize,
}

/// Compares extracted payloads against expected ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detector {
    threshold: f64,
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Detector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn verify(&self, extracted: &BitSequence, expected: &BitSequence) -> DetectionResult {
        verify(extracted, expected, self.threshold)
    }
}

/// Compute BER over the common prefix of both sequences and decide.
///
/// Sequences of different lengths are compared up to the shorter one. With
/// nothing to compare the BER is 1.0 and nothing is detected.
pub fn verify(extracted: &BitSequence, expected: &BitSequence, threshold: f64) -> DetectionResult {
    let compared = extracted.len().min(expected.len());
    let mismatches = extracted.hamming_distance(expected);
    let ber = if compared == 0 {
        1.0
    } else {
        mismatches as f64 / compared as f64
    };

    DetectionResult {
        verdict: ber < threshold,
        ber,
        confidence: (1.0 - ber) * 100.0,
        compared,
        mismatches,
    }
}
