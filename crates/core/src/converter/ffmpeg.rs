//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionResult};
use crate::format::{ActivationBytes, InputKind, OutputFormat};
use crate::storage::partial_path;

/// Upper bound on the stderr tail kept for diagnostics.
const STDERR_TAIL_BYTES: usize = 4096;

/// How a spawned ffmpeg run ended.
enum RunOutcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }


    /// Builds ffmpeg arguments for the job, writing to `target`.
    fn build_args(&self, job: &ConversionJob, target: &Path) -> Result<Vec<String>, ConverterError> {
        match job.kind {
            InputKind::Standard => Ok(self.build_standard_args(&job.input_path, target, job.format)),
            InputKind::Drm => {
                let activation = job.activation_bytes.as_ref().ok_or_else(|| {
                    ConverterError::invalid_job("activation bytes are required for AAX input")
                })?;
                Ok(self.build_drm_args(&job.input_path, target, job.format, activation))
            }
        }
    }

    /// Builds ffmpeg arguments for a plain transcode.
    fn build_standard_args(
        &self,
        input_path: &Path,
        output_path: &Path,
        format: OutputFormat,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(), // Drop embedded cover streams
            "-c:a".to_string(),
            format.ffmpeg_codec().to_string(),
        ];

        if !format.is_lossless() {
            args.extend([
                "-b:a".to_string(),
                format!("{}k", self.config.lossy_bitrate_kbps),
            ]);
        }

        self.push_output_args(&mut args, format, output_path);
        args
    }

    /// Builds ffmpeg arguments that decrypt an AAX file straight into the target format.
    fn build_drm_args(
        &self,
        input_path: &Path,
        output_path: &Path,
        format: OutputFormat,
        activation: &ActivationBytes,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            // Demuxer option, must precede the input
            "-activation_bytes".to_string(),
            activation.as_hex().to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-map_metadata".to_string(),
            "0".to_string(),
        ];

        if format == OutputFormat::M4a {
            // AAX already carries AAC; remux the decrypted stream as-is.
            args.extend(["-c:a".to_string(), "copy".to_string()]);
        } else {
            args.extend(["-c:a".to_string(), format.ffmpeg_codec().to_string()]);
            if !format.is_lossless() {
                args.extend([
                    "-b:a".to_string(),
                    format!("{}k", self.config.lossy_bitrate_kbps),
                ]);
            }
        }

        if format == OutputFormat::Mp3 {
            // ID3v2.3 is what most players read
            args.extend(["-id3v2_version".to_string(), "3".to_string()]);
        }

        self.push_output_args(&mut args, format, output_path);
        args
    }

    /// Appends log level, extra args, explicit muxer and the output path.
    fn push_output_args(&self, args: &mut Vec<String>, format: OutputFormat, output_path: &Path) {
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.extend(["-f".to_string(), format.ffmpeg_muxer().to_string()]);
        args.push(output_path.to_string_lossy().to_string());
    }

    /// Copy of `args` safe to log.
    fn redact_args(args: &[String]) -> Vec<String> {
        let mut redacted = args.to_vec();
        if let Some(pos) = redacted.iter().position(|a| a == "-activation_bytes") {
            if let Some(value) = redacted.get_mut(pos + 1) {
                *value = "<redacted>".to_string();
            }
        }
        redacted
    }

    /// Reads a stream line by line, keeping only the last few KiB.
    async fn collect_tail<R: AsyncRead + Unpin>(stream: R) -> String {
        let mut lines = BufReader::new(stream).lines();
        let mut tail: VecDeque<String> = VecDeque::new();
        let mut tail_bytes = 0usize;

        while let Ok(Some(line)) = lines.next_line().await {
            tail_bytes += line.len() + 1;
            tail.push_back(line);
            while tail_bytes > STDERR_TAIL_BYTES && tail.len() > 1 {
                if let Some(dropped) = tail.pop_front() {
                    tail_bytes -= dropped.len() + 1;
                }
            }
        }

        tail.into_iter().collect::<Vec<_>>().join("\n")
    }

    /// Spawns ffmpeg and waits for it, honouring timeout and cancellation.
    async fn run_ffmpeg(
        &self,
        job_id: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ConverterError> {
        debug!(
            "[{}] Running {:?} {:?}",
            job_id,
            self.config.ffmpeg_path,
            Self::redact_args(args)
        );

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(Self::collect_tail(stderr)));

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let outcome = tokio::select! {
            waited = timeout(timeout_duration, child.wait()) => match waited {
                Ok(status) => RunOutcome::Exited(status?),
                Err(_) => RunOutcome::TimedOut,
            },
            _ = cancel.cancelled() => RunOutcome::Cancelled,
        };

        if !matches!(outcome, RunOutcome::Exited(_)) {
            if let Err(e) = child.kill().await {
                warn!("[{}] Failed to kill ffmpeg: {}", job_id, e);
            }
        }

        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        match outcome {
            RunOutcome::Exited(status) if status.success() => Ok(()),
            RunOutcome::Exited(status) => {
                error!(
                    "[{}] ffmpeg exited with {:?}: {}",
                    job_id,
                    status.code(),
                    stderr_tail
                );
                Err(ConverterError::conversion_failed(
                    format!("FFmpeg exited with code: {:?}", status.code()),
                    if stderr_tail.is_empty() {
                        None
                    } else {
                        Some(stderr_tail)
                    },
                ))
            }
            RunOutcome::TimedOut => {
                warn!(
                    "[{}] ffmpeg timed out after {}s",
                    job_id, self.config.timeout_secs
                );
                Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
            RunOutcome::Cancelled => {
                info!("[{}] ffmpeg cancelled", job_id);
                Err(ConverterError::Cancelled)
            }
        }
    }

    /// Runs the conversion and moves the result into place.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        if tokio::fs::metadata(&job.input_path).await.is_err() {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let partial = partial_path(&job.output_path);
        let args = self.build_args(job, &partial)?;

        info!(
            "[{}] Converting ({} mode) to {}",
            job.job_id,
            job.kind.as_str(),
            job.format
        );

        let finished = async {
            self.run_ffmpeg(&job.job_id, &args, cancel).await?;

            let size = tokio::fs::metadata(&partial)
                .await
                .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?
                .len();
            if size == 0 {
                return Err(ConverterError::EmptyOutput);
            }

            tokio::fs::rename(&partial, &job.output_path).await?;
            Ok::<u64, ConverterError>(size)
        }
        .await;

        let output_size_bytes = match finished {
            Ok(size) => size,
            Err(e) => {
                remove_if_present(&partial).await;
                return Err(e);
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "[{}] Conversion finished in {} ms ({} bytes)",
            job.job_id, duration_ms, output_size_bytes
        );

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes,
            duration_ms,
            kind: job.kind,
            format: job.format,
        })
    }
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {:?}: {}", path, e),
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, &cancel).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let resolved = which::which(&self.config.ffmpeg_path).map_err(|_| {
            ConverterError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        })?;
        debug!("Using ffmpeg at {:?}", resolved);

        let output = Command::new(&resolved)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::conversion_failed(
                "ffmpeg -version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        if let Some(version) = String::from_utf8_lossy(&output.stdout).lines().next() {
            info!("{}", version);
        }

        // AAX decryption lives in the mov demuxer; older builds lack it.
        let demuxer_help = Command::new(&resolved)
            .args(["-hide_banner", "-h", "demuxer=mov"])
            .stdin(Stdio::null())
            .output()
            .await?;
        if !String::from_utf8_lossy(&demuxer_help.stdout).contains("activation_bytes") {
            warn!("ffmpeg build does not support -activation_bytes; AAX conversions will fail");
        }

        Ok(())
    }
}
