use serde::{Deserialize, Deserializer, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    5002
}

/// Working directory and upload limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Holds uploads while converting and outputs until they are swept.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Largest accepted request body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024 * 1024 // 1 GiB
}

/// How long converted outputs stay downloadable
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Outputs older than this are deleted. `0` disables the sweep and
    /// keeps them forever.
    #[serde(default = "default_output_ttl", deserialize_with = "deserialize_ttl")]
    pub output_ttl_secs: Option<u64>,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Delete an output once it has been fully served.
    #[serde(default)]
    pub delete_on_download: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            output_ttl_secs: default_output_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            delete_on_download: false,
        }
    }
}

impl RetentionConfig {
    pub fn output_ttl(&self) -> Option<Duration> {
        self.output_ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_output_ttl() -> Option<u64> {
    Some(24 * 60 * 60)
}

fn deserialize_ttl<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let secs = Option::<u64>::deserialize(deserializer)?;
    Ok(secs.filter(|&secs| secs > 0))
}

fn default_sweep_interval() -> u64 {
    300
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub converter: SanitizedConverterConfig,
    pub retention: RetentionConfig,
}

/// Converter config with extra arguments reduced to a count
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConverterConfig {
    pub ffmpeg_path: String,
    pub timeout_secs: u64,
    pub ffmpeg_log_level: String,
    pub lossy_bitrate_kbps: u32,
    pub extra_ffmpeg_args: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            converter: SanitizedConverterConfig {
                ffmpeg_path: config.converter.ffmpeg_path.display().to_string(),
                timeout_secs: config.converter.timeout_secs,
                ffmpeg_log_level: config.converter.ffmpeg_log_level.clone(),
                lossy_bitrate_kbps: config.converter.lossy_bitrate_kbps,
                extra_ffmpeg_args: config.converter.extra_ffmpeg_args.len(),
            },
            retention: config.retention.clone(),
        }
    }
}
