//! Input and output format types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ValidationError;

/// Extension of the DRM-protected Audible container.
pub const DRM_EXTENSION: &str = "aax";

/// Input extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "m4a", "flac", DRM_EXTENSION];

/// Returns the lowercase extension of a filename (text after the last `.`).
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the filename carries an allowed input extension.
pub fn is_allowed(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Which conversion path an upload takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Plain audio file, transcoded directly.
    Standard,
    /// AAX container, decrypted with activation bytes.
    Drm,
}

impl InputKind {
    /// Resolves the input kind from an uploaded filename.
    pub fn from_filename(filename: &str) -> Result<Self, ValidationError> {
        let ext = extension_of(filename)
            .ok_or_else(|| ValidationError::UnsupportedExtension(filename.to_string()))?;

        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ValidationError::UnsupportedExtension(filename.to_string()));
        }

        if ext == DRM_EXTENSION {
            Ok(Self::Drm)
        } else {
            Ok(Self::Standard)
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Drm => "drm",
        }
    }
}

/// Target format selectable by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Mp3,
    Wav,
    Ogg,
    M4a,
    Flac,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [Self::Mp3, Self::Wav, Self::Ogg, Self::M4a, Self::Flac];

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::M4a => "m4a",
            Self::Flac => "flac",
        }
    }

    /// Returns the ffmpeg encoder for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Wav => "pcm_s16le",
            Self::Ogg => "libvorbis",
            Self::M4a => "aac",
            Self::Flac => "flac",
        }
    }

    /// Returns the ffmpeg muxer name (`-f`), needed because output is
    /// written under a temporary name ffmpeg cannot infer a format from.
    pub fn ffmpeg_muxer(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::M4a => "ipod",
            Self::Flac => "flac",
        }
    }

    /// Whether this format is lossless.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Wav | Self::Flac)
    }

    /// MIME type used when serving the file.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Ogg => "audio/ogg",
            Self::M4a => "audio/mp4",
            Self::Flac => "audio/flac",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == normalized)
            .ok_or_else(|| ValidationError::UnsupportedOutputFormat(s.trim().to_string()))
    }
}
