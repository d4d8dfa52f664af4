//! Conversion orchestrator implementation.

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::registry::{CancellationRegistry, RegistrationGuard};
use super::types::{
    ConversionOutcome, ConversionState, OrchestratorError, UploadRequest, ValidatedUpload,
    DOWNLOAD_ROUTE_PREFIX,
};
use crate::converter::{ConversionJob, Converter};
use crate::format::{ActivationBytes, InputKind, OutputFormat, ValidationError};
use crate::storage::{partial_path, ScratchGuard, TempStore};

/// Runs upload requests through validation, storage and conversion.
pub struct ConversionOrchestrator {
    store: TempStore,
    converter: Arc<dyn Converter>,
    registry: CancellationRegistry,
}

impl ConversionOrchestrator {
    /// Creates an orchestrator over a working directory and a converter.
    pub fn new(store: TempStore, converter: Arc<dyn Converter>) -> Self {
        Self {
            store,
            converter,
            registry: CancellationRegistry::new(),
        }
    }

    /// Uses an existing registry (shared with other components).
    pub fn with_registry(mut self, registry: CancellationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn store(&self) -> &TempStore {
        &self.store
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Requests cancellation of an in-flight conversion.
    ///
    /// Returns `false` when nothing with that id is running.
    pub fn cancel(&self, conversion_id: &str) -> bool {
        let found = self.registry.cancel(conversion_id);
        if found {
            info!("[{}] Cancellation requested", conversion_id);
        } else {
            debug!("Cancellation requested for unknown conversion {}", conversion_id);
        }
        found
    }

    /// Checks a raw upload. Pure: nothing is written.
    pub fn validate(request: UploadRequest) -> Result<ValidatedUpload, ValidationError> {
        let file = request.file.ok_or(ValidationError::MissingFile)?;
        if file.filename.trim().is_empty() {
            return Err(ValidationError::EmptyFilename);
        }

        let kind = InputKind::from_filename(&file.filename)?;

        let format: OutputFormat = match request.format.as_deref().map(str::trim) {
            None | Some("") => return Err(ValidationError::MissingFormat),
            Some(raw) => raw.parse()?,
        };

        let provided = request
            .activation_bytes
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let activation_bytes = match (kind, provided) {
            (InputKind::Drm, None) => return Err(ValidationError::MissingActivationBytes),
            (InputKind::Drm, Some(raw)) => Some(ActivationBytes::parse(raw)?),
            (InputKind::Standard, Some(_)) => {
                debug!("Ignoring activation bytes for non-AAX upload");
                None
            }
            (InputKind::Standard, None) => None,
        };

        let conversion_id = match request.conversion_id.as_deref().map(str::trim) {
            None | Some("") => Uuid::new_v4().to_string(),
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|_| ValidationError::InvalidConversionId)?
                .to_string(),
        };

        Ok(ValidatedUpload {
            conversion_id,
            filename: file.filename,
            bytes: file.bytes,
            kind,
            format,
            activation_bytes,
        })
    }

    fn transition(id: &str, from: ConversionState, to: ConversionState) {
        debug_assert!(!from.is_terminal(), "transition out of {}", from);
        debug!("[{}] {} -> {}", id, from, to);
    }

    /// Processes one upload to completion.
    ///
    /// Validates the request, then runs it like [`Self::run`].
    pub async fn process(
        &self,
        request: UploadRequest,
    ) -> Result<ConversionOutcome, OrchestratorError> {
        let upload = Self::validate(request).map_err(|e| {
            info!("Upload rejected: {}", e);
            e
        })?;
        self.run(upload).await
    }

    /// Stores and converts an upload that already passed [`Self::validate`].
    ///
    /// The stored upload and any partial output are removed on every path out
    /// of this function, including the future being dropped mid-conversion.
    /// On failure the output path is removed too, so only a returned
    /// [`ConversionOutcome`] ever points at a file.
    pub async fn run(
        &self,
        upload: ValidatedUpload,
    ) -> Result<ConversionOutcome, OrchestratorError> {
        let id = upload.conversion_id.clone();
        Self::transition(&id, ConversionState::Received, ConversionState::Validated);

        let cancel = self
            .registry
            .register(&id)
            .ok_or_else(|| OrchestratorError::DuplicateConversionId(id.clone()))?;
        let _registration = RegistrationGuard::new(self.registry.clone(), id.clone());

        info!(
            "[{}] Upload accepted: {:?} ({} bytes, {} -> {})",
            id,
            upload.filename,
            upload.bytes.len(),
            upload.kind.as_str(),
            upload.format
        );

        let stored = match self
            .store
            .write_input(&upload.filename, upload.kind, &upload.bytes)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                error!("[{}] Failed to store upload: {}", id, e);
                Self::transition(&id, ConversionState::Validated, ConversionState::Failed);
                return Err(e.into());
            }
        };
        drop(upload.bytes);

        let (download_id, output_path) = self.store.output_path(upload.format);
        let mut scratch = ScratchGuard::new();
        scratch.track(&stored.path);
        scratch.track(partial_path(&output_path));
        scratch.track(&output_path);
        Self::transition(&id, ConversionState::Validated, ConversionState::Stored);

        let job = ConversionJob {
            job_id: id.clone(),
            input_path: stored.path.clone(),
            output_path: output_path.clone(),
            kind: stored.kind,
            format: upload.format,
            activation_bytes: upload.activation_bytes,
        };

        Self::transition(&id, ConversionState::Stored, ConversionState::Converting);
        match self.converter.convert(job, cancel).await {
            Ok(result) => {
                scratch.keep(&output_path);
                Self::transition(&id, ConversionState::Converting, ConversionState::Succeeded);
                let download_url = format!("{}/{}", DOWNLOAD_ROUTE_PREFIX, download_id);
                info!("[{}] Conversion succeeded: {}", id, download_url);
                Ok(ConversionOutcome {
                    conversion_id: id,
                    download_id,
                    download_url,
                    output_size_bytes: result.output_size_bytes,
                    duration_ms: result.duration_ms,
                    kind: result.kind,
                    format: result.format,
                })
            }
            Err(e) => {
                Self::transition(&id, ConversionState::Converting, ConversionState::Failed);
                match e.diagnostic() {
                    Some(diagnostic) => {
                        warn!("[{}] Conversion failed: {}\n{}", id, e, diagnostic)
                    }
                    None => warn!("[{}] Conversion failed: {}", id, e),
                }
                Err(e.into())
            }
        }
    }
}
