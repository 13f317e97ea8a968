//! Single-channel floating point sample planes and image normalization.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::error::{Result, WatermarkError};

/// Side length of the canonical square resolution images are resized to.
pub const CANONICAL_SIZE: u32 = 512;

/// Resampling filter used for the canonical resize (bicubic).
pub const CANONICAL_FILTER: FilterType = FilterType::CatmullRom;

/// A 2D grid of samples stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayPlane {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl GrayPlane {
    /// Create a zero-filled plane.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Wrap row-major samples. The sample count must equal `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != width * height {
            return Err(WatermarkError::InvalidParameter(format!(
                "plane of {width}x{height} needs {} samples, got {}",
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert an 8-bit grayscale image to samples.
    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.as_raw().iter().map(|&v| f64::from(v)).collect();
        Self {
            width: width as usize,
            height: height as usize,
            data,
        }
    }

    /// Clip samples to the 8-bit display range and truncate toward zero.
    ///
    /// Truncation keeps the sign of sub-integer changes to an integer-valued
    /// plane: `p - 0.2` becomes `p - 1`, where rounding would give back `p`.
    pub fn to_gray_image(&self) -> GrayImage {
        let mut image = GrayImage::new(self.width as u32, self.height as u32);
        for (pixel, &value) in image.pixels_mut().zip(self.data.iter()) {
            *pixel = Luma([value.clamp(0.0, 255.0) as u8]);
        }
        image
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data[y * self.width + x] = value;
    }

    /// Row-major samples (the flattened view blocks are cut from).
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn row(&self, y: usize) -> &[f64] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Copy of column `x`.
    pub fn column(&self, x: usize) -> Vec<f64> {
        (0..self.height).map(|y| self.get(x, y)).collect()
    }

    /// Largest absolute sample difference against another plane of the same shape.
    pub fn max_abs_diff(&self, other: &Self) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }
}

/// Convert any image to single-channel luminance at `size`×`size`.
///
/// Images that already have the target size are only converted, never resampled.
pub fn normalize(image: &DynamicImage, size: u32) -> Result<GrayImage> {
    if size == 0 {
        return Err(WatermarkError::InvalidImageDimensions {
            width: 0,
            height: 0,
            levels: 0,
        });
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(WatermarkError::InvalidImageDimensions {
            width: image.width() as usize,
            height: image.height() as usize,
            levels: 0,
        });
    }

    let gray = image.to_luma8();
    if gray.dimensions() == (size, size) {
        return Ok(gray);
    }

    debug!(
        from_width = gray.width(),
        from_height = gray.height(),
        size,
        "Resizing to canonical resolution"
    );
    Ok(image::imageops::resize(&gray, size, size, CANONICAL_FILTER))
}

/// Normalize an image and convert it to a sample plane.
pub fn normalized_plane(image: &DynamicImage, size: u32) -> Result<GrayPlane> {
    Ok(GrayPlane::from_gray_image(&normalize(image, size)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_from_vec_checks_length() {
        assert!(GrayPlane::from_vec(2, 2, vec![0.0; 4]).is_ok());
        assert!(GrayPlane::from_vec(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_to_gray_image_truncates_and_clips() {
        let plane = GrayPlane::from_vec(4, 1, vec![-3.0, 12.4, 12.6, 300.0]).unwrap();
        let image = plane.to_gray_image();
        assert_eq!(image.as_raw(), &vec![0, 12, 12, 255]);
    }

    #[test]
    fn test_to_gray_image_keeps_small_negative_changes() {
        // Sub-integer perturbations of integer samples must not vanish
        let plane = GrayPlane::from_vec(4, 1, vec![99.8, 100.2, 99.55, 100.0]).unwrap();
        let image = plane.to_gray_image();
        assert_eq!(image.as_raw(), &vec![99, 100, 99, 100]);
    }

    #[test]
    fn test_gray_image_roundtrip() {
        let image = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 40 + y * 7) as u8]));
        let plane = GrayPlane::from_gray_image(&image);
        assert_eq!(plane.shape(), (5, 3));
        assert_eq!(plane.get(4, 2), 174.0);
        assert_eq!(plane.to_gray_image(), image);
    }

    #[test]
    fn test_normalize_resizes_and_converts() {
        let rgb = RgbImage::from_pixel(64, 32, Rgb([200, 10, 10]));
        let gray = normalize(&DynamicImage::ImageRgb8(rgb), 16).unwrap();
        assert_eq!(gray.dimensions(), (16, 16));
    }

    #[test]
    fn test_normalize_keeps_canonical_pixels() {
        let gray = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 30 + y) as u8]));
        let normalized = normalize(&DynamicImage::ImageLuma8(gray.clone()), 8).unwrap();
        assert_eq!(normalized, gray);
    }

    #[test]
    fn test_normalize_rejects_empty() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(matches!(
            normalize(&empty, 16),
            Err(WatermarkError::InvalidImageDimensions { .. })
        ));
    }

    #[test]
    fn test_column_and_row() {
        let plane = GrayPlane::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(plane.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(plane.column(2), vec![3.0, 6.0]);
    }
}
