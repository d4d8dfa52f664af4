//! Conversion orchestrator for upload requests.
//!
//! The orchestrator drives one upload through its state machine:
//!
//! `Received -> Validated -> Stored -> Converting -> Succeeded | Failed`
//!
//! It is the single place that decides client-facing error wording and it
//! always removes the stored upload, whatever the outcome. Requests are
//! independent; any number may run concurrently.

mod registry;
mod runner;
mod types;

pub use registry::CancellationRegistry;
pub use runner::ConversionOrchestrator;
pub use types::{
    ConversionOutcome, ConversionState, OrchestratorError, UploadRequest, UploadedFile,
    ValidatedUpload, DOWNLOAD_ROUTE_PREFIX,
};
