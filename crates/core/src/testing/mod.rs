//! Testing utilities and mock implementations for E2E tests.
//!
//! Provides a mock [`Converter`](crate::converter::Converter) so the upload
//! pipeline and the HTTP layer can be exercised without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use convertino_core::testing::{fixtures, MockConverter};
//!
//! let converter = MockConverter::new();
//! let orchestrator = ConversionOrchestrator::new(store, Arc::new(converter.clone()));
//!
//! let outcome = orchestrator.process(fixtures::upload("a.wav", "mp3")).await?;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::orchestrator::{UploadRequest, UploadedFile};

    /// Create an upload request for a standard audio file.
    pub fn upload(filename: &str, format: &str) -> UploadRequest {
        UploadRequest {
            file: Some(UploadedFile {
                filename: filename.to_string(),
                bytes: wav_bytes(1, 8000),
            }),
            format: Some(format.to_string()),
            activation_bytes: None,
            conversion_id: None,
        }
    }

    /// Create an upload request for a DRM-protected file.
    pub fn aax_upload(filename: &str, format: &str, activation_bytes: &str) -> UploadRequest {
        UploadRequest {
            file: Some(UploadedFile {
                filename: filename.to_string(),
                bytes: b"aaxfake".to_vec(),
            }),
            format: Some(format.to_string()),
            activation_bytes: Some(activation_bytes.to_string()),
            conversion_id: None,
        }
    }

    /// Generate a mono 16-bit PCM WAV containing a 440 Hz tone.
    pub fn wav_bytes(duration_secs: u32, sample_rate: u32) -> Vec<u8> {
        let samples = duration_secs * sample_rate;
        let data_len = samples * 2;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());

        for n in 0..samples {
            let t = n as f32 / sample_rate as f32;
            let value = (t * 440.0 * std::f32::consts::TAU).sin() * i16::MAX as f32 * 0.3;
            out.extend_from_slice(&(value as i16).to_le_bytes());
        }
        out
    }

    /// Sorted names of the regular files directly under `dir`.
    pub fn list_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
