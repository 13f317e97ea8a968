//! Bits command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use invisimark_core::{token_to_bits_with, DigestAlgorithm};

use crate::config::CliConfig;

/// Execute the bits command.
pub fn execute(
    config: &CliConfig,
    token: String,
    n_bits: Option<usize>,
    digest: Option<String>,
    quiet: bool,
) -> Result<()> {
    let algorithm = match digest {
        Some(name) => name.parse::<DigestAlgorithm>()?,
        None => config.params.digest,
    };
    let n_bits = n_bits.unwrap_or(config.params.n_bits);

    let bits = token_to_bits_with(algorithm, &token, n_bits)
        .context("Failed to derive payload bits")?;

    if quiet {
        println!("{}", bits.to_hex());
        return Ok(());
    }

    println!();
    println!("   {} {}", "Digest:".dimmed(), algorithm);
    println!("   {} {}", "Length:".dimmed(), bits.len());
    println!("   {} {}", "Bits:".dimmed(), bits);
    println!("   {} {}", "Hex:".dimmed(), bits.to_hex());

    Ok(())
}
