//! Trait definitions for the converter module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionResult};

/// Something that turns an uploaded audio file into the requested format.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts a file as described by the job.
    ///
    /// On success exactly one file exists at `job.output_path`. On failure
    /// nothing is left there. Cancelling `cancel` aborts the conversion with
    /// [`ConverterError::Cancelled`].
    async fn convert(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
