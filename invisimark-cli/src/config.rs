//! CLI configuration
//!
//! Loads default watermark parameters from environment variables. Command-line
//! flags override these values.

use invisimark_core::{WatermarkParams, WaveletKind, DEFAULT_THRESHOLD};
use tracing::warn;

/// Defaults for all commands, loaded from `INVISIMARK_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Embedding parameters (INVISIMARK_ALPHA, INVISIMARK_WAVELET, INVISIMARK_LEVELS,
    /// INVISIMARK_BLOCK_SIZE, INVISIMARK_N_BITS)
    pub params: WatermarkParams,
    /// Detection threshold (INVISIMARK_THRESHOLD, default: 0.35)
    pub threshold: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            params: WatermarkParams::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut params = defaults.params;

        if let Some(alpha) = parse_var(&lookup, "INVISIMARK_ALPHA") {
            params.alpha = alpha;
        }
        if let Some(wavelet) = parse_var::<WaveletKind>(&lookup, "INVISIMARK_WAVELET") {
            params.wavelet = wavelet;
        }
        if let Some(levels) = parse_var(&lookup, "INVISIMARK_LEVELS") {
            params.levels = levels;
        }
        if let Some(block_size) = parse_var(&lookup, "INVISIMARK_BLOCK_SIZE") {
            params.block_size = block_size;
        }
        if let Some(n_bits) = parse_var(&lookup, "INVISIMARK_N_BITS") {
            params.n_bits = n_bits;
        }
        let threshold =
            parse_var(&lookup, "INVISIMARK_THRESHOLD").unwrap_or(defaults.threshold);

        Self { params, threshold }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}
