//! Collision-free file naming and best-effort cleanup.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::StorageError;
use super::types::{is_scratch_name, DownloadId, StoredInput};
use crate::format::{InputKind, OutputFormat};

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Fallback name when sanitizing leaves nothing usable.
const FALLBACK_NAME: &str = "upload";

/// Reduces a client-supplied filename to a safe single path component.
///
/// Directory components (either separator) are dropped, anything outside
/// `[A-Za-z0-9._-]` becomes `_` and leading dots are removed so the result
/// can be neither hidden nor `..`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let replaced = UNSAFE_CHARS.replace_all(base, "_");
    let trimmed = replaced.trim_start_matches('.');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Manages the working directory holding uploads and outputs.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Creates a store rooted at `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store and makes sure its directory exists.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: store.root.clone(),
                source,
            })?;
        info!("Working directory ready at {:?}", store.root);
        Ok(store)
    }

    /// The working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns a fresh, unique path for an upload named `original_name`.
    pub fn reserve(&self, original_name: &str) -> PathBuf {
        let name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        self.root.join(name)
    }

    /// Persists an upload under a freshly reserved path.
    ///
    /// The file is created exclusively; if writing fails halfway the partial
    /// file is removed before the error is returned.
    pub async fn write_input(
        &self,
        original_name: &str,
        kind: InputKind,
        bytes: &[u8],
    ) -> Result<StoredInput, StorageError> {
        let path = self.reserve(original_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::Collision { path: path.clone() }
                } else {
                    StorageError::Write {
                        path: path.clone(),
                        source,
                    }
                }
            })?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(source) = written {
            drop(file);
            self.release(&path).await;
            return Err(StorageError::Write { path, source });
        }

        debug!("Stored {} bytes at {:?}", bytes.len(), path);

        Ok(StoredInput { path, kind })
    }

    /// Allocates the download identifier and final path for a conversion output.
    pub fn output_path(&self, format: OutputFormat) -> (DownloadId, PathBuf) {
        let id = DownloadId::generate(format);
        let path = self.root.join(id.file_name());
        (id, path)
    }

    /// Deletes a file if present. Failures are logged, never returned.
    pub async fn release(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Released {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete {:?}: {}", path, e),
        }
    }

    /// Maps a download name back to an existing output file.
    ///
    /// Returns `None` for names that are not a well-formed download
    /// identifier or whose file no longer exists.
    pub async fn resolve_download(&self, name: &str) -> Option<(DownloadId, PathBuf)> {
        let id: DownloadId = name.parse().ok()?;
        let path = self.root.join(id.file_name());
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some((id, path)),
            _ => None,
        }
    }

    /// Deletes converted outputs last modified more than `ttl` ago.
    ///
    /// Stored uploads and partial outputs older than `ttl` are reaped as
    /// well; they belong to requests that ended without releasing them.
    /// Returns the number of outputs removed.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut outputs = 0;
        let mut scratch = 0;
        for (name, age) in self.list_managed().await {
            if age < ttl {
                continue;
            }
            let is_output = name.parse::<DownloadId>().is_ok();
            if self.remove_entry(&name).await {
                if is_output {
                    outputs += 1;
                } else {
                    scratch += 1;
                }
            }
        }
        if scratch > 0 {
            warn!("Reaped {} stale upload or partial file(s)", scratch);
        }
        outputs
    }

    /// Deletes every stored upload and partial output regardless of age.
    ///
    /// Only safe while no conversion is running, i.e. at startup.
    pub async fn purge_scratch(&self) -> usize {
        let mut removed = 0;
        for (name, _) in self.list_managed().await {
            if is_scratch_name(&name) && self.remove_entry(&name).await {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Removed {} leftover upload or partial file(s)", removed);
        }
        removed
    }

    /// Names and ages of the files this store created.
    async fn list_managed(&self) -> Vec<(String, Duration)> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read working directory {:?}: {}", self.root, e);
                return Vec::new();
            }
        };

        let now = SystemTime::now();
        let mut managed = Vec::new();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while listing {:?}: {}", self.root, e);
                    break;
                }
            };

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.parse::<DownloadId>().is_err() && !is_scratch_name(&name) {
                continue;
            }

            match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => {
                    let age = now.duration_since(modified).unwrap_or_default();
                    managed.push((name, age));
                }
                Err(e) => warn!("Cannot stat {:?}: {}", entry.path(), e),
            }
        }

        managed
    }

    async fn remove_entry(&self, name: &str) -> bool {
        let path = self.root.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Expired file removed: {:?}", path);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to delete expired file {:?}: {}", path, e);
                false
            }
        }
    }
}
