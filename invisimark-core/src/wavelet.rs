//! Multi-level separable 2D discrete wavelet transform.
//!
//! # Algorithm
//!
//! Each level filters every row and then every column of its input with an
//! orthonormal low-pass / high-pass filter pair and keeps every second output
//! sample. Boundaries are handled by periodization, which keeps the transform
//! orthogonal: `reconstruct(decompose(x)) == x` up to floating-point rounding.
//! Odd-length signals are extended by repeating their last sample; the extra
//! sample is dropped again on reconstruction.
//!
//! # Pyramid layout
//!
//! Levels are indexed the conventional way: index 0 is the approximation,
//! index 1 the coarsest detail level and index `levels` the finest one (the
//! level computed directly from the input image).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WatermarkError};
use crate::plane::GrayPlane;

const HAAR: [f64; 2] = [std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2];

const DB2: [f64; 4] = [
    0.48296291314453416,
    0.8365163037378079,
    0.22414386804201339,
    -0.12940952255126037,
];

const DB3: [f64; 6] = [
    0.3326705529509569,
    0.8068915093133388,
    0.4598775021193313,
    -0.13501102001039084,
    -0.08544127388224149,
    0.035226291882100656,
];

const DB4: [f64; 8] = [
    0.23037781330885523,
    0.7148465705525415,
    0.6308807679295904,
    -0.02798376941698385,
    -0.18703481171888114,
    0.030841381835986965,
    0.032883011666982945,
    -0.010597401784997278,
];

/// Orthogonal wavelet filter-bank family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveletKind {
    /// Haar (Daubechies 1), 2 taps.
    Haar,
    /// Daubechies 2, 4 taps.
    #[default]
    Db2,
    /// Daubechies 3, 6 taps.
    Db3,
    /// Daubechies 4, 8 taps.
    Db4,
}

impl WaveletKind {
    pub const ALL: [WaveletKind; 4] = [Self::Haar, Self::Db2, Self::Db3, Self::Db4];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Haar => "haar",
            Self::Db2 => "db2",
            Self::Db3 => "db3",
            Self::Db4 => "db4",
        }
    }

    /// Low-pass (scaling) filter taps.
    pub fn lowpass(&self) -> &'static [f64] {
        match self {
            Self::Haar => &HAAR,
            Self::Db2 => &DB2,
            Self::Db3 => &DB3,
            Self::Db4 => &DB4,
        }
    }

    /// High-pass (wavelet) filter taps, the alternating flip of the low-pass filter.
    pub fn highpass(&self) -> Vec<f64> {
        let lo = self.lowpass();
        let n = lo.len();
        (0..n)
            .map(|j| if j % 2 == 0 { lo[n - 1 - j] } else { -lo[n - 1 - j] })
            .collect()
    }
}

impl fmt::Display for WaveletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveletKind {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haar" | "db1" => Ok(Self::Haar),
            "db2" => Ok(Self::Db2),
            "db3" => Ok(Self::Db3),
            "db4" => Ok(Self::Db4),
            other => Err(WatermarkError::UnsupportedWaveletFamily(other.to_string())),
        }
    }
}

/// Orientation of a detail subband.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Low-pass along rows, high-pass along columns.
    Horizontal,
    /// High-pass along rows, low-pass along columns.
    Vertical,
    /// High-pass in both directions.
    Diagonal,
}

impl Orientation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Horizontal => "HL",
            Self::Vertical => "LH",
            Self::Diagonal => "HH",
        }
    }
}

/// Address of a detail subband inside a pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubbandId {
    /// Pyramid index, `1..=levels` (1 is the coarsest detail level).
    pub level: usize,
    pub orientation: Orientation,
}

impl SubbandId {
    /// The subband payload bits are embedded in: coarsest level, horizontal detail.
    pub const WATERMARK_TARGET: SubbandId = SubbandId {
        level: 1,
        orientation: Orientation::Horizontal,
    };

    pub const fn new(level: usize, orientation: Orientation) -> Self {
        Self { level, orientation }
    }
}

impl fmt::Display for SubbandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {} {}", self.level, self.orientation.label())
    }
}

/// The three detail subbands of one decomposition level.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailBands {
    pub horizontal: GrayPlane,
    pub vertical: GrayPlane,
    pub diagonal: GrayPlane,
}

impl DetailBands {
    pub fn get(&self, orientation: Orientation) -> &GrayPlane {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
            Orientation::Diagonal => &self.diagonal,
        }
    }

    pub fn get_mut(&mut self, orientation: Orientation) -> &mut GrayPlane {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
            Orientation::Diagonal => &mut self.diagonal,
        }
    }
}

/// A subband pyramid produced by [`decompose`].
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletCoefficients {
    kind: WaveletKind,
    approximation: GrayPlane,
    /// Coarsest level first.
    details: Vec<DetailBands>,
    /// Shape of the plane each level was computed from, coarsest level first.
    input_shapes: Vec<(usize, usize)>,
}

impl WaveletCoefficients {
    pub fn kind(&self) -> WaveletKind {
        self.kind
    }

    pub fn levels(&self) -> usize {
        self.details.len()
    }

    pub fn approximation(&self) -> &GrayPlane {
        &self.approximation
    }

    /// Detail subbands at pyramid index `level` (`1..=levels`).
    pub fn detail(&self, level: usize) -> Option<&DetailBands> {
        level.checked_sub(1).and_then(|i| self.details.get(i))
    }

    pub fn subband(&self, id: SubbandId) -> Result<&GrayPlane> {
        self.detail(id.level)
            .map(|bands| bands.get(id.orientation))
            .ok_or_else(|| self.missing_level(id))
    }

    pub fn subband_mut(&mut self, id: SubbandId) -> Result<&mut GrayPlane> {
        let err = self.missing_level(id);
        id.level
            .checked_sub(1)
            .and_then(|i| self.details.get_mut(i))
            .map(|bands| bands.get_mut(id.orientation))
            .ok_or(err)
    }

    /// Replace a subband, returning the previous one. Shapes must match.
    pub fn replace_subband(&mut self, id: SubbandId, plane: GrayPlane) -> Result<GrayPlane> {
        let slot = self.subband_mut(id)?;
        if slot.shape() != plane.shape() {
            return Err(WatermarkError::InvalidParameter(format!(
                "replacement for {id} has shape {:?}, expected {:?}",
                plane.shape(),
                slot.shape()
            )));
        }
        Ok(std::mem::replace(slot, plane))
    }

    fn missing_level(&self, id: SubbandId) -> WatermarkError {
        WatermarkError::InvalidParameter(format!(
            "subband {id} does not exist in a {}-level pyramid",
            self.levels()
        ))
    }
}

/// Check that a `width`×`height` plane survives `levels` halvings.
pub fn check_dimensions(width: usize, height: usize, levels: usize) -> Result<()> {
    if levels == 0 {
        return Err(WatermarkError::InvalidParameter(
            "wavelet decomposition needs at least one level".into(),
        ));
    }
    let too_small = |dim: usize| levels >= usize::BITS as usize || (dim >> levels) == 0;
    if too_small(width) || too_small(height) {
        return Err(WatermarkError::InvalidImageDimensions {
            width,
            height,
            levels,
        });
    }
    Ok(())
}

/// Decompose a plane into a `levels`-deep subband pyramid.
pub fn decompose(plane: &GrayPlane, kind: WaveletKind, levels: usize) -> Result<WaveletCoefficients> {
    check_dimensions(plane.width(), plane.height(), levels)?;

    let lo = kind.lowpass();
    let hi = kind.highpass();

    let mut details = Vec::with_capacity(levels);
    let mut input_shapes = Vec::with_capacity(levels);
    let mut current = plane.clone();

    for _ in 0..levels {
        input_shapes.push(current.shape());
        let (approximation, bands) = analyze_2d(&current, lo, &hi);
        details.push(bands);
        current = approximation;
    }

    details.reverse();
    input_shapes.reverse();

    debug!(
        wavelet = %kind,
        levels,
        approximation_width = current.width(),
        approximation_height = current.height(),
        "Decomposed plane"
    );

    Ok(WaveletCoefficients {
        kind,
        approximation: current,
        details,
        input_shapes,
    })
}

/// Invert [`decompose`], including any subbands replaced in between.
pub fn reconstruct(coefficients: &WaveletCoefficients) -> GrayPlane {
    let lo = coefficients.kind.lowpass();
    let hi = coefficients.kind.highpass();

    coefficients
        .details
        .iter()
        .zip(coefficients.input_shapes.iter())
        .fold(coefficients.approximation.clone(), |approximation, (bands, &shape)| {
            synthesize_2d(&approximation, bands, shape, lo, &hi)
        })
}

fn analyze_2d(plane: &GrayPlane, lo: &[f64], hi: &[f64]) -> (GrayPlane, DetailBands) {
    let (width, height) = plane.shape();
    let half_w = width.div_ceil(2);
    let half_h = height.div_ceil(2);

    let mut row_lo = GrayPlane::zeros(half_w, height);
    let mut row_hi = GrayPlane::zeros(half_w, height);
    for y in 0..height {
        let (a, d) = analyze_1d(plane.row(y), lo, hi);
        for x in 0..half_w {
            row_lo.set(x, y, a[x]);
            row_hi.set(x, y, d[x]);
        }
    }

    let split_columns = |source: &GrayPlane| {
        let mut low = GrayPlane::zeros(half_w, half_h);
        let mut high = GrayPlane::zeros(half_w, half_h);
        for x in 0..half_w {
            let (a, d) = analyze_1d(&source.column(x), lo, hi);
            for y in 0..half_h {
                low.set(x, y, a[y]);
                high.set(x, y, d[y]);
            }
        }
        (low, high)
    };

    let (approximation, horizontal) = split_columns(&row_lo);
    let (vertical, diagonal) = split_columns(&row_hi);

    (
        approximation,
        DetailBands {
            horizontal,
            vertical,
            diagonal,
        },
    )
}

fn synthesize_2d(
    approximation: &GrayPlane,
    bands: &DetailBands,
    (width, height): (usize, usize),
    lo: &[f64],
    hi: &[f64],
) -> GrayPlane {
    let half_w = approximation.width();

    let merge_columns = |low: &GrayPlane, high: &GrayPlane| {
        let mut merged = GrayPlane::zeros(half_w, height);
        for x in 0..half_w {
            let column = synthesize_1d(&low.column(x), &high.column(x), lo, hi, height);
            for (y, value) in column.into_iter().enumerate() {
                merged.set(x, y, value);
            }
        }
        merged
    };

    let row_lo = merge_columns(approximation, &bands.horizontal);
    let row_hi = merge_columns(&bands.vertical, &bands.diagonal);

    let mut output = GrayPlane::zeros(width, height);
    for y in 0..height {
        let row = synthesize_1d(row_lo.row(y), row_hi.row(y), lo, hi, width);
        output.as_mut_slice()[y * width..(y + 1) * width].copy_from_slice(&row);
    }
    output
}

/// One analysis step on a periodized signal: `(approximation, detail)`.
fn analyze_1d(signal: &[f64], lo: &[f64], hi: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut extended = signal.to_vec();
    if extended.len() % 2 == 1 {
        if let Some(&last) = extended.last() {
            extended.push(last);
        }
    }

    let n = extended.len();
    let half = n / 2;
    let mut approximation = vec![0.0; half];
    let mut detail = vec![0.0; half];

    for k in 0..half {
        let mut a = 0.0;
        let mut d = 0.0;
        for (j, (&l, &h)) in lo.iter().zip(hi.iter()).enumerate() {
            let sample = extended[(2 * k + j) % n];
            a += l * sample;
            d += h * sample;
        }
        approximation[k] = a;
        detail[k] = d;
    }

    (approximation, detail)
}

/// Inverse of [`analyze_1d`], truncated to the original signal length `len`.
fn synthesize_1d(
    approximation: &[f64],
    detail: &[f64],
    lo: &[f64],
    hi: &[f64],
    len: usize,
) -> Vec<f64> {
    let n = approximation.len() * 2;
    let mut output = vec![0.0; n];

    for (k, (&a, &d)) in approximation.iter().zip(detail.iter()).enumerate() {
        for (j, (&l, &h)) in lo.iter().zip(hi.iter()).enumerate() {
            output[(2 * k + j) % n] += l * a + h * d;
        }
    }

    output.truncate(len);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_plane(width: usize, height: usize) -> GrayPlane {
        let data = (0..width * height)
            .map(|i| {
                let (x, y) = ((i % width) as f64, (i / width) as f64);
                128.0 + 60.0 * (x * 0.7).sin() * (y * 1.3).cos() + ((i * 37) % 23) as f64
            })
            .collect();
        GrayPlane::from_vec(width, height, data).unwrap()
    }

    fn energy(plane: &GrayPlane) -> f64 {
        plane.as_slice().iter().map(|v| v * v).sum()
    }

    #[test]
    fn test_filters_are_orthonormal() {
        for kind in WaveletKind::ALL {
            let lo = kind.lowpass();
            let hi = kind.highpass();
            let sum: f64 = lo.iter().sum();
            let norm: f64 = lo.iter().map(|v| v * v).sum();
            let cross: f64 = lo.iter().zip(hi.iter()).map(|(a, b)| a * b).sum();
            assert!((sum - std::f64::consts::SQRT_2).abs() < 1e-9, "{kind} sum");
            assert!((norm - 1.0).abs() < 1e-9, "{kind} norm");
            assert!(cross.abs() < 1e-9, "{kind} cross");
            assert!(hi.iter().sum::<f64>().abs() < 1e-9, "{kind} highpass dc");
        }
    }

    #[test]
    fn test_perfect_reconstruction_all_families() {
        let plane = textured_plane(32, 24);
        for kind in WaveletKind::ALL {
            let coefficients = decompose(&plane, kind, 2).unwrap();
            let restored = reconstruct(&coefficients);
            let error = restored.max_abs_diff(&plane).unwrap();
            assert!(error < 1e-6, "{kind}: reconstruction error {error}");
        }
    }

    #[test]
    fn test_perfect_reconstruction_odd_dimensions() {
        let plane = textured_plane(13, 9);
        let coefficients = decompose(&plane, WaveletKind::Db2, 2).unwrap();
        assert_eq!(coefficients.subband(SubbandId::WATERMARK_TARGET).unwrap().shape(), (4, 3));
        let restored = reconstruct(&coefficients);
        assert_eq!(restored.shape(), (13, 9));
        assert!(restored.max_abs_diff(&plane).unwrap() < 1e-6);
    }

    #[test]
    fn test_energy_preserved() {
        let plane = textured_plane(16, 12);
        let coefficients = decompose(&plane, WaveletKind::Db2, 2).unwrap();
        let mut total = energy(coefficients.approximation());
        for level in 1..=coefficients.levels() {
            let bands = coefficients.detail(level).unwrap();
            total += energy(&bands.horizontal) + energy(&bands.vertical) + energy(&bands.diagonal);
        }
        let input = energy(&plane);
        assert!((total - input).abs() / input < 1e-9);
    }

    #[test]
    fn test_pyramid_shapes() {
        let plane = GrayPlane::zeros(512, 512);
        let coefficients = decompose(&plane, WaveletKind::Db2, 2).unwrap();
        assert_eq!(coefficients.levels(), 2);
        assert_eq!(coefficients.approximation().shape(), (128, 128));
        assert_eq!(coefficients.detail(1).unwrap().horizontal.shape(), (128, 128));
        assert_eq!(coefficients.detail(2).unwrap().diagonal.shape(), (256, 256));
        assert!(coefficients.detail(0).is_none());
        assert!(coefficients.detail(3).is_none());
    }

    #[test]
    fn test_constant_plane_has_no_detail() {
        let plane = GrayPlane::from_vec(16, 16, vec![77.0; 256]).unwrap();
        let coefficients = decompose(&plane, WaveletKind::Db3, 2).unwrap();
        for level in 1..=2 {
            let bands = coefficients.detail(level).unwrap();
            for band in [&bands.horizontal, &bands.vertical, &bands.diagonal] {
                assert!(band.as_slice().iter().all(|v| v.abs() < 1e-9));
            }
        }
    }

    #[test]
    fn test_replace_subband() {
        let plane = textured_plane(32, 32);
        let mut coefficients = decompose(&plane, WaveletKind::Haar, 2).unwrap();
        let target = SubbandId::WATERMARK_TARGET;
        let zeros = GrayPlane::zeros(8, 8);

        let previous = coefficients.replace_subband(target, zeros).unwrap();
        assert!(reconstruct(&coefficients).max_abs_diff(&plane).unwrap() > 1e-3);

        coefficients.replace_subband(target, previous).unwrap();
        assert!(reconstruct(&coefficients).max_abs_diff(&plane).unwrap() < 1e-6);
    }

    #[test]
    fn test_replace_subband_rejects_wrong_shape() {
        let mut coefficients = decompose(&textured_plane(32, 32), WaveletKind::Haar, 2).unwrap();
        let result = coefficients.replace_subband(SubbandId::WATERMARK_TARGET, GrayPlane::zeros(4, 4));
        assert!(matches!(result, Err(WatermarkError::InvalidParameter(_))));
    }

    #[test]
    fn test_missing_subband_level() {
        let coefficients = decompose(&textured_plane(32, 32), WaveletKind::Haar, 2).unwrap();
        let id = SubbandId::new(3, Orientation::Diagonal);
        assert!(coefficients.subband(id).is_err());
    }

    #[test]
    fn test_dimension_errors() {
        assert!(matches!(
            decompose(&GrayPlane::zeros(3, 64), WaveletKind::Db2, 2),
            Err(WatermarkError::InvalidImageDimensions { .. })
        ));
        assert!(matches!(
            decompose(&GrayPlane::zeros(0, 0), WaveletKind::Db2, 1),
            Err(WatermarkError::InvalidImageDimensions { .. })
        ));
        assert!(matches!(
            decompose(&GrayPlane::zeros(64, 64), WaveletKind::Db2, 0),
            Err(WatermarkError::InvalidParameter(_))
        ));
        assert!(check_dimensions(4, 4, 2).is_ok());
    }

    #[test]
    fn test_wavelet_kind_parse() {
        assert_eq!("db2".parse::<WaveletKind>().unwrap(), WaveletKind::Db2);
        assert_eq!("DB1".parse::<WaveletKind>().unwrap(), WaveletKind::Haar);
        let err = "sym5".parse::<WaveletKind>().unwrap_err();
        assert!(matches!(err, WatermarkError::UnsupportedWaveletFamily(ref f) if f == "sym5"));
        assert_eq!(WaveletKind::default(), WaveletKind::Db2);
    }
}
