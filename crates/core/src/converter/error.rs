//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during conversion.
///
/// Every failure of the external tool is normalised into one of these
/// variants; no raw process error escapes the converter.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The job cannot be run as described.
    #[error("Invalid conversion job: {reason}")]
    InvalidJob { reason: String },

    /// Conversion process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// FFmpeg reported success but wrote nothing.
    #[error("Conversion produced an empty output file")]
    EmptyOutput,

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Job was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new invalid job error.
    pub fn invalid_job(reason: impl Into<String>) -> Self {
        Self::InvalidJob {
            reason: reason.into(),
        }
    }

    /// The tool's diagnostic output, when there is any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ConversionFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FfmpegNotFound { .. } => "ffmpeg_not_found",
            Self::InputNotFound { .. } => "input_not_found",
            Self::InvalidJob { .. } => "invalid_job",
            Self::ConversionFailed { .. } => "failed",
            Self::EmptyOutput => "empty_output",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
        }
    }
}
