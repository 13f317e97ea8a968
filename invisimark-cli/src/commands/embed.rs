//! Embed command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use invisimark_core::{Payload, WatermarkCodec};
use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::utils::{
    apply_overrides, build_descriptor_path, build_output_path, is_lossy_format, load_image,
};
use crate::{OutputFormat, ParamArgs};

/// Options of the embed command.
pub struct EmbedOptions {
    pub cover: PathBuf,
    pub token: String,
    pub output: Option<PathBuf>,
    pub alpha: Option<f64>,
    pub format: OutputFormat,
    pub params: ParamArgs,
}

/// Execute the embed command.
pub fn execute(config: &CliConfig, options: EmbedOptions, quiet: bool) -> Result<()> {
    let mut params = apply_overrides(config.params, &options.params)?;
    if let Some(alpha) = options.alpha {
        params.alpha = alpha;
    }

    let codec = WatermarkCodec::new(params).context("Invalid watermark parameters")?;
    let cover = load_image(&options.cover)?;

    let output = options
        .output
        .unwrap_or_else(|| build_output_path(&options.cover));
    if is_lossy_format(&output) {
        warn!(path = %output.display(), "Saving watermarked image with a lossy format");
        if !quiet {
            eprintln!(
                "{}",
                "Lossy output format: the watermark is weakened before it is ever verified".yellow()
            );
        }
    }

    let marked = codec
        .embed_watermark(&cover, &Payload::Token(options.token))
        .context("Failed to embed watermark")?;

    marked
        .image
        .save(&output)
        .with_context(|| format!("Failed to write image: {}", output.display()))?;
    info!(path = %output.display(), "Watermarked image saved");

    let descriptor_path = build_descriptor_path(&output);
    let descriptor_bytes = match options.format {
        OutputFormat::Cbor => marked
            .descriptor
            .to_cbor()
            .context("Failed to serialize descriptor to CBOR")?,
        OutputFormat::Json => marked
            .descriptor
            .to_json()
            .context("Failed to serialize descriptor to JSON")?
            .into_bytes(),
    };
    std::fs::write(&descriptor_path, descriptor_bytes).with_context(|| {
        format!(
            "Failed to write descriptor file: {}",
            descriptor_path.display()
        )
    })?;
    debug!(format = ?options.format, path = %descriptor_path.display(), "Descriptor saved");

    if !quiet {
        let descriptor = &marked.descriptor;
        println!();
        println!("{}", "Watermark embedded".green().bold());
        println!();
        println!("   {} {}", "Image saved:".dimmed(), output.display());
        println!("   {} {}", "Descriptor:".dimmed(), descriptor_path.display());
        println!(
            "   {} {} of {} blocks",
            "Payload bits:".dimmed(),
            descriptor.payload_bits,
            descriptor.capacity
        );
        println!(
            "   {} {} / {} levels / {} {}",
            "Transform:".dimmed(),
            descriptor.params.wavelet,
            descriptor.params.levels,
            descriptor.params.subband,
            format!("(block size {})", descriptor.params.block_size).dimmed()
        );
        println!("   {} {}", "Alpha:".dimmed(), descriptor.params.alpha);
    }

    Ok(())
}
