//! Invisimark CLI - invisible image watermarking tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

mod commands;
mod config;
mod exit_codes;
mod utils;

use config::CliConfig;
use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "invisimark")]
#[command(author, version, about = "Invisible DWT/SVD image watermarking", long_about = None)]
#[command(after_help = "Exit codes:
  0   Success
  1   General error
  64  Usage error
  65  Watermark not detected or parameter mismatch
  66  Input file not found or unreadable
  74  Output file could not be written")]
struct Cli {
    /// Suppress all non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Serialization format for descriptor files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cbor,
    Json,
}

/// Watermark parameter overrides shared by all commands.
///
/// Unset options fall back to the descriptor (when one is loaded), then to
/// `INVISIMARK_*` environment variables, then to built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct ParamArgs {
    /// Wavelet family (haar, db1, db2, db3, db4)
    #[arg(long)]
    pub wavelet: Option<String>,

    /// Number of wavelet decomposition levels
    #[arg(long)]
    pub levels: Option<usize>,

    /// Samples per embedding block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Payload length in bits
    #[arg(long)]
    pub n_bits: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a token-derived watermark into an image
    Embed {
        /// Path to the cover image
        #[arg(value_name = "COVER")]
        cover: PathBuf,

        /// Token whose digest forms the payload
        #[arg(short, long)]
        token: String,

        /// Output image path (defaults to <COVER stem>.wm.png)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Perturbation strength
        #[arg(long)]
        alpha: Option<f64>,

        /// Descriptor file format
        #[arg(short, long, value_enum, default_value = "cbor")]
        format: OutputFormat,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Extract raw payload bits from a suspect image
    Extract {
        /// Image that may carry a watermark
        #[arg(value_name = "SUSPECT")]
        suspect: PathBuf,

        /// Unmodified original image
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Descriptor file (defaults to <SUSPECT>.wmark when present)
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Check whether a suspect image carries a token's watermark
    Verify {
        /// Image that may carry a watermark
        #[arg(value_name = "SUSPECT")]
        suspect: PathBuf,

        /// Unmodified original image
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Token expected to be embedded
        #[arg(short, long)]
        token: String,

        /// Descriptor file (defaults to <SUSPECT>.wmark when present)
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        /// BER below which the watermark counts as detected
        #[arg(long)]
        threshold: Option<f64>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Print the payload bits derived from a token
    Bits {
        /// Token to hash
        #[arg(value_name = "TOKEN")]
        token: String,

        /// Payload length in bits (at most 256)
        #[arg(long)]
        n_bits: Option<usize>,

        /// Digest algorithm (sha256, sha3-256)
        #[arg(long)]
        digest: Option<String>,
    },
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    let config = CliConfig::from_env();
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Embed {
            cover,
            token,
            output,
            alpha,
            format,
            params,
        } => commands::embed::execute(
            &config,
            commands::embed::EmbedOptions {
                cover,
                token,
                output,
                alpha,
                format,
                params,
            },
            quiet,
        ),
        Commands::Extract {
            suspect,
            reference,
            descriptor,
            params,
        } => commands::extract::execute(&config, suspect, reference, descriptor, params, quiet),
        Commands::Verify {
            suspect,
            reference,
            token,
            descriptor,
            threshold,
            params,
        } => commands::verify::execute(
            &config,
            commands::verify::VerifyOptions {
                suspect,
                reference,
                token,
                descriptor,
                threshold,
                params,
            },
            quiet,
        ),
        Commands::Bits {
            token,
            n_bits,
            digest,
        } => commands::bits::execute(&config, token, n_bits, digest, quiet),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            let exit = ExitCode::from_anyhow(&err);
            if let Some(message) = &exit.message {
                eprintln!("{} {}", "Error:".red().bold(), message);
            }
            exit.into()
        }
    }
}
