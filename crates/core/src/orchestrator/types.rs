//! Types for the conversion orchestrator.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::converter::ConverterError;
use crate::format::{ActivationBytes, InputKind, OutputFormat, ValidationError};
use crate::storage::{DownloadId, StorageError};

/// Path prefix under which converted files are served.
pub const DOWNLOAD_ROUTE_PREFIX: &str = "/download";

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as declared by the client (untrusted).
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Raw upload as received over HTTP, before any validation.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub format: Option<String>,
    pub activation_bytes: Option<String>,
    /// Optional client-chosen id, so the request can be cancelled while in flight.
    pub conversion_id: Option<String>,
}

/// An upload that passed validation.
#[derive(Debug)]
pub struct ValidatedUpload {
    pub conversion_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub kind: InputKind,
    pub format: OutputFormat,
    pub activation_bytes: Option<ActivationBytes>,
}

/// Per-request lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Received,
    Validated,
    Stored,
    Converting,
    Succeeded,
    Failed,
}

impl ConversionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Stored => "stored",
            Self::Converting => "converting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub conversion_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub download_id: DownloadId,
    pub download_url: String,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
    pub kind: InputKind,
    pub format: OutputFormat,
}

fn serialize_display<S: serde::Serializer>(value: &DownloadId, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Errors that end a request in the `Failed` state.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Client sent something unusable. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another in-flight conversion already uses this id.
    #[error("conversion id already in use: {0}")]
    DuplicateConversionId(String),

    /// The external tool failed or was cancelled.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConverterError),

    /// Persisting the upload failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OrchestratorError {
    /// Text safe to return to the client.
    ///
    /// Validation messages are returned as-is. Everything else is reduced to
    /// a generic message so paths and tool output stay server-side.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::DuplicateConversionId(_) => "Conversion id already in use".to_string(),
            Self::Conversion(ConverterError::Cancelled) => "Conversion cancelled".to_string(),
            Self::Conversion(ConverterError::Timeout { .. }) => "Conversion timed out".to_string(),
            Self::Conversion(_) => "Conversion failed".to_string(),
            Self::Storage(_) => "Internal storage error".to_string(),
        }
    }

    /// Whether the client caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DuplicateConversionId(_))
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateConversionId(_) => "duplicate_id",
            Self::Conversion(e) => e.kind(),
            Self::Storage(_) => "storage",
        }
    }
}
