//! Extract command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use invisimark_core::{BitSequence, WatermarkCodec, WatermarkDescriptor};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::utils::{apply_overrides, load_image, resolve_descriptor};
use crate::ParamArgs;

/// Outcome of an extraction, shared with the verify command.
pub struct Extraction {
    pub codec: WatermarkCodec,
    pub bits: BitSequence,
    pub descriptor: Option<WatermarkDescriptor>,
}

/// Recover bits from a suspect, using the descriptor when one is available.
pub fn extract_bits(
    config: &CliConfig,
    suspect_path: &Path,
    reference_path: &Path,
    descriptor_path: Option<&Path>,
    args: &ParamArgs,
) -> Result<Extraction> {
    let descriptor = resolve_descriptor(suspect_path, descriptor_path)?;

    let suspect = load_image(suspect_path)?;
    let reference = load_image(reference_path)?;

    let (codec, bits) = match &descriptor {
        Some(descriptor) => {
            let params = apply_overrides(descriptor.params, args)?;
            let codec = WatermarkCodec::new(params).context("Invalid watermark parameters")?;
            let bits = codec
                .extract_with_descriptor(descriptor, &suspect, &reference)
                .context("Failed to extract watermark")?;
            (codec, bits)
        }
        None => {
            warn!("No descriptor found, assuming configured watermark parameters");
            let params = apply_overrides(config.params, args)?;
            let codec = WatermarkCodec::new(params).context("Invalid watermark parameters")?;
            let bits = codec
                .extract_watermark(&suspect, &reference)
                .context("Failed to extract watermark")?;
            (codec, bits)
        }
    };

    info!(bits = bits.len(), "Extracted payload");
    Ok(Extraction {
        codec,
        bits,
        descriptor,
    })
}

/// Execute the extract command.
pub fn execute(
    config: &CliConfig,
    suspect: PathBuf,
    reference: PathBuf,
    descriptor: Option<PathBuf>,
    params: ParamArgs,
    quiet: bool,
) -> Result<()> {
    let Extraction { codec, bits, .. } =
        extract_bits(config, &suspect, &reference, descriptor.as_deref(), &params)?;

    if quiet {
        println!("{bits}");
        return Ok(());
    }

    println!();
    println!("   {} {}", "Bits extracted:".dimmed(), bits.len());
    if bits.len() < codec.params().n_bits {
        println!(
            "   {} {}",
            "Note:".yellow(),
            format!(
                "requested {} bits, subband holds only {}",
                codec.params().n_bits,
                bits.len()
            )
            .yellow()
        );
    }
    println!("   {} {}", "Bits:".dimmed(), bits);
    println!("   {} {}", "Hex:".dimmed(), bits.to_hex());

    Ok(())
}
