//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (watermark not detected, mismatched parameters).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("not detected") || message.contains("Parameter mismatch") {
            VERIFICATION_FAILED
        } else if message.contains("Failed to write") || message.contains("serialize") {
            IO_ERROR
        } else if message.contains("Invalid parameter")
            || message.contains("Unsupported wavelet")
            || message.contains("Invalid image dimensions")
        {
            USAGE_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(exit: ExitCode) -> Self {
        if exit.code == SUCCESS {
            return std::process::ExitCode::SUCCESS;
        }
        u8::try_from(exit.code)
            .map(std::process::ExitCode::from)
            .unwrap_or(std::process::ExitCode::FAILURE)
    }
}
