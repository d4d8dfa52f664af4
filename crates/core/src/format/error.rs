//! Error types for upload validation.

use thiserror::Error;

/// A request was rejected before any file was written.
///
/// Every variant is caused by the client. The message is safe to return
/// verbatim in an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("No output format specified")]
    MissingFormat,

    #[error("Unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    #[error("File type not allowed: {0}")]
    UnsupportedExtension(String),

    #[error("Activation bytes are required for AAX files")]
    MissingActivationBytes,

    #[error("Invalid activation bytes format")]
    InvalidActivationBytes,

    #[error("Invalid conversion id")]
    InvalidConversionId,
}
