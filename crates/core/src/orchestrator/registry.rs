//! Tracking of in-flight conversions for cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Maps conversion ids to the cancellation token of their running conversion.
///
/// Cancellation is advisory: it signals the converter, which kills the
/// external process if it is still running.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a conversion. Returns `None` if the id is already active.
    pub fn register(&self, id: &str) -> Option<CancellationToken> {
        let mut entries = self.entries();
        if entries.contains_key(id) {
            return None;
        }
        let token = CancellationToken::new();
        entries.insert(id.to_string(), token.clone());
        Some(token)
    }

    /// Requests cancellation. Returns `false` if no such conversion is active.
    pub fn cancel(&self, id: &str) -> bool {
        match self.entries().get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forgets a conversion.
    pub fn remove(&self, id: &str) {
        self.entries().remove(id);
    }

    /// Number of conversions currently in flight.
    pub fn active_count(&self) -> usize {
        self.entries().len()
    }
}

/// Removes its registry entry when dropped, on every exit path.
pub(crate) struct RegistrationGuard {
    registry: CancellationRegistry,
    id: String,
}

impl RegistrationGuard {
    pub(crate) fn new(registry: CancellationRegistry, id: String) -> Self {
        Self { registry, id }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
