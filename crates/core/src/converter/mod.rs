//! Converter module for transcoding uploaded audio.
//!
//! This module provides the `Converter` trait and an implementation that
//! shells out to FFmpeg. Two paths exist, selected by
//! [`InputKind`](crate::format::InputKind):
//!
//! - **Standard**: decode the upload and encode it in the target format.
//! - **DRM**: decrypt an AAX container with the user's activation bytes and
//!   write the target format in the same pass, carrying metadata over.
//!
//! # Example
//!
//! ```ignore
//! use convertino_core::converter::{Converter, ConversionJob, FfmpegConverter};
//! use convertino_core::format::{InputKind, OutputFormat};
//! use tokio_util::sync::CancellationToken;
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let job = ConversionJob {
//!     job_id: "job-1".to_string(),
//!     input_path: PathBuf::from("/uploads/in.wav"),
//!     output_path: PathBuf::from("/uploads/out.mp3"),
//!     kind: InputKind::Standard,
//!     format: OutputFormat::Mp3,
//!     activation_bytes: None,
//! };
//!
//! let result = converter.convert(job, CancellationToken::new()).await?;
//! println!("Converted in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{ConversionJob, ConversionResult};
