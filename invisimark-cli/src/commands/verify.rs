//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use invisimark_core::{DetectionResult, Detector, Payload};
use tracing::{error, info};

use crate::commands::extract::extract_bits;
use crate::config::CliConfig;
use crate::ParamArgs;

/// Options of the verify command.
pub struct VerifyOptions {
    pub suspect: PathBuf,
    pub reference: PathBuf,
    pub token: String,
    pub descriptor: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub params: ParamArgs,
}

/// Execute the verify command.
pub fn execute(config: &CliConfig, options: VerifyOptions, quiet: bool) -> Result<()> {
    let extraction = extract_bits(
        config,
        &options.suspect,
        &options.reference,
        options.descriptor.as_deref(),
        &options.params,
    )?;

    let expected = extraction
        .codec
        .payload_bits(&Payload::Token(options.token))?;
    let threshold = options
        .threshold
        .or(extraction.descriptor.as_ref().map(|d| d.threshold))
        .unwrap_or(config.threshold);
    let detector = Detector::new(threshold);
    let result = detector.verify(&extraction.bits, &expected);

    if result.verdict {
        info!(
            ber = result.ber,
            compared = result.compared,
            "Watermark detected"
        );

        if !quiet {
            println!();
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!(
                "{}",
                "║          WATERMARK DETECTED            ║".green().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".green());
            println!();
            print_details(&result, detector.threshold());
        }
        Ok(())
    } else {
        error!(
            ber = result.ber,
            threshold = detector.threshold(),
            "Watermark not detected"
        );

        if !quiet {
            println!();
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!(
                "{}",
                "║        NO VALID WATERMARK FOUND        ║".red().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".red());
            println!();
            print_details(&result, detector.threshold());
        }
        bail!(
            "Verification failed: watermark not detected (BER {:.3} >= {})",
            result.ber,
            detector.threshold()
        )
    }
}

fn print_details(result: &DetectionResult, threshold: f64) {
    println!(
        "   {} {} ({} mismatched)",
        "Bits compared:".dimmed(),
        result.compared,
        result.mismatches
    );
    println!(
        "   {} {:.3} {}",
        "Bit error rate:".dimmed(),
        result.ber,
        format!("(threshold {threshold})").dimmed()
    );
    println!("   {} {:.1}%", "Confidence:".dimmed(), result.confidence);
}
