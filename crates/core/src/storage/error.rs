//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting uploads.
///
/// These are server faults. The paths they carry must never be shown to
/// clients.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Working directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing an uploaded file failed (disk full, permissions, ...).
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A freshly reserved path already existed.
    #[error("Path already exists: {path}")]
    Collision { path: PathBuf },

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
