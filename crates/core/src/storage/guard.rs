//! Request-scoped files that must not outlive their request.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Deletes every tracked file when dropped.
///
/// Runs on every way out of a conversion, including the request future
/// being dropped while it waits on the converter.
#[derive(Debug, Default)]
pub struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl ScratchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path to delete on drop. It does not need to exist yet.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Stops tracking `path` so it survives the guard.
    pub fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Released {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete {:?}: {}", path, e),
            }
        }
    }
}
