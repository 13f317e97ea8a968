//! Example demonstrating codec tracing instrumentation.
//!
//! Embeds a token into a synthetic cover, then verifies it with the right
//! and a wrong token while printing the codec's debug spans.
//!
//! Run with: cargo run -p invisimark-core --example codec_tracing

use image::{DynamicImage, GrayImage, Luma};
use invisimark_core::{Detector, Payload, WatermarkCodec};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("invisimark_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Watermark Codec Tracing Demo ===\n");

    let cover = DynamicImage::ImageLuma8(GrayImage::from_fn(512, 512, |x, y| {
        let v = 128.0 + 50.0 * (x as f64 * 0.3).sin() * (y as f64 * 0.7).cos();
        Luma([v as u8])
    }));

    let codec = WatermarkCodec::default();
    println!("Params: {:?}\n", codec.params());

    let marked = match codec.embed_watermark(&cover, &Payload::token("demo-session")) {
        Ok(marked) => marked,
        Err(e) => {
            eprintln!("Failed to embed: {}", e);
            return;
        }
    };
    let suspect = DynamicImage::ImageLuma8(marked.image);

    let extracted = match codec.extract_with_descriptor(&marked.descriptor, &suspect, &cover) {
        Ok(bits) => bits,
        Err(e) => {
            eprintln!("Failed to extract: {}", e);
            return;
        }
    };

    let detector = Detector::default();
    for token in ["demo-session", "someone-else"] {
        let expected = match codec.payload_bits(&Payload::token(token)) {
            Ok(bits) => bits,
            Err(e) => {
                eprintln!("Failed to derive bits: {}", e);
                return;
            }
        };
        let result = detector.verify(&extracted, &expected);
        let mark = if result.verdict { "✅" } else { "❌" };
        println!(
            "\n{} {:<14} BER {:.3}  confidence {:.1}%",
            mark, token, result.ber, result.confidence
        );
    }
}
