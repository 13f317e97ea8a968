//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use invisimark_core::{WatermarkDescriptor, WatermarkParams, WaveletKind};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::ParamArgs;

/// Initialize the tracing subscriber on stderr.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown unless
/// `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("invisimark=debug,invisimark_core=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the descriptor path for an image.
///
/// Transforms `file.ext` into `file.ext.wmark`.
pub fn build_descriptor_path(file: &Path) -> PathBuf {
    file.with_extension(format!(
        "{}.wmark",
        file.extension().and_then(|e| e.to_str()).unwrap_or("img")
    ))
}

/// Default output path for a watermarked image: `<stem>.wm.png` next to the cover.
pub fn build_output_path(cover: &Path) -> PathBuf {
    let stem = cover
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    cover.with_file_name(format!("{stem}.wm.png"))
}

/// Whether saving to this path uses a lossy encoding.
pub fn is_lossy_format(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "webp")
    )
}

/// Open and decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "Loaded image");
    Ok(image)
}

/// Load a descriptor file, trying CBOR first then JSON.
pub fn load_descriptor(path: &Path) -> Result<WatermarkDescriptor> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read descriptor file: {}", path.display()))?;
    let descriptor = WatermarkDescriptor::from_bytes(&bytes)
        .with_context(|| format!("Failed to parse descriptor file: {}", path.display()))?;
    debug!(path = %path.display(), version = descriptor.version, "Loaded descriptor");
    Ok(descriptor)
}

/// Resolve the descriptor for a suspect: an explicit path must exist, the
/// default sidecar is used only when present.
pub fn resolve_descriptor(
    suspect: &Path,
    explicit: Option<&Path>,
) -> Result<Option<WatermarkDescriptor>> {
    match explicit {
        Some(path) => load_descriptor(path).map(Some),
        None => {
            let sidecar = build_descriptor_path(suspect);
            if sidecar.exists() {
                load_descriptor(&sidecar).map(Some)
            } else {
                Ok(None)
            }
        }
    }
}

/// Apply command-line overrides on top of base parameters.
pub fn apply_overrides(base: WatermarkParams, args: &ParamArgs) -> Result<WatermarkParams> {
    let mut params = base;
    if let Some(wavelet) = &args.wavelet {
        params.wavelet = wavelet.parse::<WaveletKind>()?;
    }
    if let Some(levels) = args.levels {
        params.levels = levels;
    }
    if let Some(block_size) = args.block_size {
        params.block_size = block_size;
    }
    if let Some(n_bits) = args.n_bits {
        params.n_bits = n_bits;
    }
    Ok(params)
}
