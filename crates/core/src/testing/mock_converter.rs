//! Mock converter for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::converter::{ConversionJob, ConversionResult, Converter, ConverterError};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Writes a small fake output file on success so that download paths can be
/// exercised without ffmpeg. Controllable behavior:
/// - Track conversion jobs for assertions
/// - Simulate success/failure
/// - Simulate slow conversions that honour cancellation
/// - Report the peak number of concurrent conversions
///
/// # Example
///
/// ```rust,ignore
/// use convertino_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_conversion_duration(Duration::from_secs(5)).await;
///
/// let result = converter.convert(job, CancellationToken::new()).await?;
///
/// let conversions = converter.recorded_conversions().await;
/// assert_eq!(conversions.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration.
    conversion_duration: Arc<RwLock<Duration>>,
    /// Bytes written as the output file.
    output_bytes: Arc<RwLock<Vec<u8>>>,
    /// Leave a stray file at the output path when failing.
    leave_output_on_failure: Arc<RwLock<bool>>,
    /// Whether `validate` succeeds.
    available: Arc<RwLock<bool>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            conversion_duration: Arc::new(RwLock::new(Duration::ZERO)),
            output_bytes: Arc::new(RwLock::new(b"converted audio".to_vec())),
            leave_output_on_failure: Arc::new(RwLock::new(false)),
            available: Arc::new(RwLock::new(true)),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions started.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration.write().await = duration;
    }

    /// Set the bytes written as output.
    pub async fn set_output_bytes(&self, bytes: Vec<u8>) {
        *self.output_bytes.write().await = bytes;
    }

    /// Misbehave like a tool that leaves partial output behind.
    pub async fn set_leave_output_on_failure(&self, leave: bool) {
        *self.leave_output_on_failure.write().await = leave;
    }

    /// Make `validate` fail as if the binary were missing.
    pub async fn set_available(&self, available: bool) {
        *self.available.write().await = available;
    }

    /// Conversions currently running.
    pub fn active_conversions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of conversions seen running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, job: &ConversionJob, success: bool) {
        self.conversions.write().await.push(RecordedConversion {
            job: job.clone(),
            success,
        });
    }

    async fn fail(&self, job: &ConversionJob, err: ConverterError) -> ConverterError {
        if *self.leave_output_on_failure.read().await {
            let _ = tokio::fs::write(&job.output_path, b"partial").await;
        }
        self.record(job, false).await;
        err
    }

    async fn run(
        &self,
        job: &ConversionJob,
        cancel: &CancellationToken,
    ) -> Result<u64, ConverterError> {
        let duration = *self.conversion_duration.read().await;
        if !duration.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = cancel.cancelled() => {
                    return Err(self.fail(job, ConverterError::Cancelled).await);
                }
            }
        } else if cancel.is_cancelled() {
            return Err(self.fail(job, ConverterError::Cancelled).await);
        }

        if let Some(err) = self.take_error().await {
            return Err(self.fail(job, err).await);
        }

        if !job.input_path.exists() {
            let err = ConverterError::InputNotFound {
                path: job.input_path.clone(),
            };
            return Err(self.fail(job, err).await);
        }

        let bytes = self.output_bytes.read().await.clone();
        tokio::fs::write(&job.output_path, &bytes).await?;
        self.record(job, true).await;
        Ok(bytes.len() as u64)
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let started = std::time::Instant::now();
        let outcome = self.run(&job, &cancel).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let size = outcome?;
        Ok(ConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: size,
            duration_ms: started.elapsed().as_millis() as u64,
            kind: job.kind,
            format: job.format,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if *self.available.read().await {
            Ok(())
        } else {
            Err(ConverterError::FfmpegNotFound {
                path: PathBuf::from("ffmpeg"),
            })
        }
    }
}
