//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::format::{ActivationBytes, InputKind, OutputFormat};

/// A conversion job request.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Conversion id, used for logs and cancellation.
    pub job_id: String,
    /// Input file path.
    pub input_path: PathBuf,
    /// Final output path. Nothing is visible here unless conversion succeeds.
    pub output_path: PathBuf,
    /// Conversion path.
    pub kind: InputKind,
    /// Target format.
    pub format: OutputFormat,
    /// Required for [`InputKind::Drm`].
    pub activation_bytes: Option<ActivationBytes>,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Job ID.
    pub job_id: String,
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Conversion duration in milliseconds.
    pub duration_ms: u64,
    /// Conversion path taken.
    pub kind: InputKind,
    /// Output format produced.
    pub format: OutputFormat,
}
