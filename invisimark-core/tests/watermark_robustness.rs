//! Robustness tests for the DWT/SVD watermark.
//!
//! These tests embed token-derived payloads into synthetic 512x512 covers and
//! check that they can be recovered after lossless storage, JPEG re-encoding
//! and additive noise.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use invisimark_core::{
    extract_watermark, verify, BitSequence, Detector, Payload, WatermarkCodec, WatermarkParams,
    WaveletKind, DEFAULT_THRESHOLD,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOKEN: &str = "worker42_session_2025-11-16T15:00:00Z";

/// Create a textured grayscale cover.
///
/// Sinusoids give mid-frequency structure, seeded noise keeps every block's
/// singular values well away from zero. Values stay inside [20, 235] so the
/// embedded perturbation is never clipped.
fn create_cover(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    GrayImage::from_fn(width, height, |x, y| {
        let (xf, yf) = (x as f64, y as f64);
        let base = 128.0
            + 40.0 * (xf * 0.21).sin() * (yf * 0.83).cos()
            + 25.0 * ((xf + yf) * 0.05).cos();
        let noise: f64 = rng.gen_range(-20.0..20.0);
        Luma([(base + noise).clamp(20.0, 235.0).round() as u8])
    })
}

/// Save to PNG in memory and decode again.
fn png_roundtrip(img: &GrayImage) -> DynamicImage {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("PNG encoding failed");
    image::load_from_memory(&buffer.into_inner()).expect("PNG decoding failed")
}

/// Compress an image to JPEG with the specified quality (1-100).
fn compress_jpeg(img: &GrayImage, quality: u8) -> DynamicImage {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageLuma8(img.clone())
        .write_with_encoder(encoder)
        .expect("JPEG encoding failed");
    image::load_from_memory(&buffer.into_inner()).expect("JPEG decoding failed")
}

/// Add uniform noise in `[-amplitude, amplitude]` to every pixel.
fn add_noise(img: &GrayImage, amplitude: f64, seed: u64) -> DynamicImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut noisy = img.clone();
    for pixel in noisy.pixels_mut() {
        let value = f64::from(pixel[0]) + rng.gen_range(-amplitude..amplitude);
        *pixel = Luma([value.round().clamp(0.0, 255.0) as u8]);
    }
    DynamicImage::ImageLuma8(noisy)
}

fn random_bits(len: usize, seed: u64) -> BitSequence {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_bool(0.5)).collect()
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[test]
fn test_end_to_end_lossless_roundtrip() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 7));
    let codec = WatermarkCodec::new(WatermarkParams::default().with_alpha(1.5)).unwrap();
    let payload = Payload::token(TOKEN);

    let marked = codec.embed_watermark(&cover, &payload).expect("embed failed");
    assert_eq!(marked.image.dimensions(), (512, 512));

    let reloaded = png_roundtrip(&marked.image);
    let extracted = codec
        .extract_watermark(&reloaded, &cover)
        .expect("extract failed");
    let expected = codec.payload_bits(&payload).unwrap();

    assert_eq!(extracted.len(), 128);
    let result = verify(&extracted, &expected, DEFAULT_THRESHOLD);
    println!("Lossless roundtrip - BER: {:.3}", result.ber);

    assert_eq!(result.ber, 0.0);
    assert!(result.verdict);
    assert_eq!(result.confidence, 100.0);
}

#[test]
fn test_end_to_end_with_descriptor() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 11));
    let codec = WatermarkCodec::default();
    let payload = Payload::token(TOKEN);
    let marked = codec.embed_watermark(&cover, &payload).unwrap();

    let cbor = marked.descriptor.to_cbor().unwrap();
    let descriptor = invisimark_core::WatermarkDescriptor::from_cbor(&cbor).unwrap();
    let verifier = WatermarkCodec::from_descriptor(&descriptor).unwrap();

    let suspect = png_roundtrip(&marked.image);
    let extracted = verifier
        .extract_with_descriptor(&descriptor, &suspect, &cover)
        .unwrap();
    let expected = verifier.payload_bits(&payload).unwrap();

    assert!(Detector::default().verify(&extracted, &expected).verdict);
    assert_eq!(extracted.hamming_distance(&expected), 0);
}

#[test]
fn test_color_cover_is_normalized() {
    let gray = create_cover(640, 480, 3);
    let color = RgbImage::from_fn(640, 480, |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v.saturating_sub(10), v.saturating_add(10)])
    });
    let cover = DynamicImage::ImageRgb8(color);

    let marked = invisimark_core::embed_watermark(
        &cover,
        &Payload::token(TOKEN),
        1.5,
        WaveletKind::Db2,
        2,
    )
    .unwrap();
    assert_eq!(marked.dimensions(), (512, 512));

    let extracted = extract_watermark(
        &DynamicImage::ImageLuma8(marked),
        &cover,
        128,
        WaveletKind::Db2,
        2,
        8,
    )
    .unwrap();
    let expected = invisimark_core::token_to_bits(TOKEN, 128).unwrap();
    let result = verify(&extracted, &expected, DEFAULT_THRESHOLD);
    println!("Color cover - BER: {:.3}", result.ber);
    assert!(result.ber < 0.05);
}

#[test]
fn test_prepared_reference_matches_direct_extraction() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 5));
    let codec = WatermarkCodec::default();
    let marked = codec.embed_watermark(&cover, &Payload::token(TOKEN)).unwrap();
    let suspect = DynamicImage::ImageLuma8(marked.image);

    let prepared = codec.prepare_reference(&cover).unwrap();
    let cached = codec.extract_prepared(&suspect, &prepared).unwrap();
    let direct = codec.extract_watermark(&suspect, &cover).unwrap();
    assert_eq!(cached, direct);
}

#[test]
fn test_unmarked_image_not_detected() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 13));
    let other = DynamicImage::ImageLuma8(create_cover(512, 512, 14));
    let codec = WatermarkCodec::default();
    let payload = Payload::token(TOKEN);

    // A different watermark on the same cover
    let marked = codec
        .embed_watermark(&cover, &Payload::token("someone_else"))
        .unwrap();
    let extracted = codec
        .extract_watermark(&DynamicImage::ImageLuma8(marked.image), &cover)
        .unwrap();
    let expected = codec.payload_bits(&payload).unwrap();
    let result = verify(&extracted, &expected, DEFAULT_THRESHOLD);
    println!("Wrong token - BER: {:.3}", result.ber);
    assert!(!result.verdict);

    // An unrelated image against the cover as reference
    let extracted = codec.extract_watermark(&other, &cover).unwrap();
    let result = verify(&extracted, &expected, DEFAULT_THRESHOLD);
    println!("Unrelated image - BER: {:.3}", result.ber);
    assert!(!result.verdict);
}

// ============================================================================
// Capacity policy
// ============================================================================

#[test]
fn test_full_capacity_payload() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 17));
    let params = WatermarkParams::default().with_n_bits(4096);
    let codec = WatermarkCodec::new(params).unwrap();
    assert_eq!(params.capacity(), 2048);

    let bits = random_bits(4096, 1);
    let marked = codec.embed_watermark(&cover, &Payload::from(bits.clone())).unwrap();
    assert_eq!(marked.descriptor.payload_bits, 2048);

    let extracted = codec.extract_watermark(&png_roundtrip(&marked.image), &cover).unwrap();
    assert_eq!(extracted.len(), 2048);

    let result = verify(&extracted, &bits, DEFAULT_THRESHOLD);
    assert_eq!(result.compared, 2048);
    assert!(result.ber < 0.01, "BER {}", result.ber);
}

// ============================================================================
// JPEG re-encoding
// ============================================================================

#[test]
fn test_jpeg_quality_95() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 21));
    let codec = WatermarkCodec::default();
    let payload = Payload::token(TOKEN);
    let marked = codec.embed_watermark(&cover, &payload).unwrap();

    let degraded = compress_jpeg(&marked.image, 95);
    let extracted = codec.extract_watermark(&degraded, &cover).unwrap();
    let result = verify(&extracted, &codec.payload_bits(&payload).unwrap(), DEFAULT_THRESHOLD);
    println!("JPEG 95% quality - BER: {:.3}", result.ber);

    assert!(
        result.verdict,
        "JPEG 95% should preserve the watermark (BER: {:.3})",
        result.ber
    );
}

#[test]
fn test_jpeg_quality_90() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 23));
    let codec = WatermarkCodec::default();
    let payload = Payload::token(TOKEN);
    let marked = codec.embed_watermark(&cover, &payload).unwrap();

    let degraded = compress_jpeg(&marked.image, 90);
    let extracted = codec.extract_watermark(&degraded, &cover).unwrap();
    let result = verify(&extracted, &codec.payload_bits(&payload).unwrap(), DEFAULT_THRESHOLD);
    println!("JPEG 90% quality - BER: {:.3}", result.ber);

    assert!(
        result.ber < DEFAULT_THRESHOLD,
        "JPEG 90% should keep BER below {} (BER: {:.3})",
        DEFAULT_THRESHOLD,
        result.ber
    );
}

/// Quality 80 is the documented floor for detection.
#[test]
fn test_jpeg_quality_80() {
    let cover = DynamicImage::ImageLuma8(create_cover(512, 512, 29));
    let codec = WatermarkCodec::default();
    let payload = Payload::token(TOKEN);
    let marked = codec.embed_watermark(&cover, &payload).unwrap();

    let degraded = compress_jpeg(&marked.image, 80);
    let extracted = codec.extract_watermark(&degraded, &cover).unwrap();
    let result = verify(&extracted, &codec.payload_bits(&payload).unwrap(), DEFAULT_THRESHOLD);
    println!("JPEG 80% quality - BER: {:.3}", result.ber);

    assert!(
        result.verdict,
        "JPEG 80% should keep BER below {} (BER: {:.3})",
        DEFAULT_THRESHOLD,
        result.ber
    );
}

// ============================================================================
// Alpha vs. robustness
// ============================================================================

#[test]
fn test_ber_does_not_grow_with_alpha() {
    let alphas = [0.5, 1.5, 3.0];
    let trials = [31u64, 37, 41];
    let mut mean_ber = [0.0f64; 3];

    for &seed in &trials {
        let cover = DynamicImage::ImageLuma8(create_cover(512, 512, seed));
        let bits = random_bits(2048, seed);

        for (slot, &alpha) in mean_ber.iter_mut().zip(alphas.iter()) {
            let params = WatermarkParams::default()
                .with_alpha(alpha)
                .with_n_bits(2048);
            let codec = WatermarkCodec::new(params).unwrap();
            let marked = codec
                .embed_watermark(&cover, &Payload::from(bits.clone()))
                .unwrap();

            let degraded = add_noise(&marked.image, 3.0, seed + 1000);
            let extracted = codec.extract_watermark(&degraded, &cover).unwrap();
            *slot += verify(&extracted, &bits, DEFAULT_THRESHOLD).ber / trials.len() as f64;
        }
    }

    println!("Mean BER by alpha {:?}: {:?}", alphas, mean_ber);
    assert!(mean_ber[1] <= mean_ber[0]);
    assert!(mean_ber[2] <= mean_ber[1]);
    assert!(mean_ber[2] < mean_ber[0]);
}
