//! Periodic removal of expired outputs.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::temp_store::TempStore;

/// Called with the number of files removed by each sweep.
pub type SweepCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Background task deleting outputs older than a TTL.
pub struct RetentionSweeper {
    store: TempStore,
    ttl: Duration,
    interval: Duration,
    on_sweep: Option<SweepCallback>,
}

impl RetentionSweeper {
    pub fn new(store: TempStore, ttl: Duration, interval: Duration) -> Self {
        Self {
            store,
            ttl,
            interval,
            on_sweep: None,
        }
    }

    /// Sets a callback invoked after each sweep that removed something.
    pub fn with_callback(mut self, callback: SweepCallback) -> Self {
        self.on_sweep = Some(callback);
        self
    }

    /// Runs a single sweep.
    pub async fn sweep_once(&self) -> usize {
        let removed = self.store.sweep_expired(self.ttl).await;
        if removed > 0 {
            info!("Retention sweep removed {} expired output(s)", removed);
            if let Some(ref callback) = self.on_sweep {
                callback(removed);
            }
        } else {
            debug!("Retention sweep found nothing to remove");
        }
        removed
    }

    /// Spawns the sweep loop; it stops when `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Retention sweeper started (ttl: {}s, interval: {}s)",
                self.ttl.as_secs(),
                self.interval.as_secs()
            );
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                }
            }

            info!("Retention sweeper stopped");
        })
    }
}
