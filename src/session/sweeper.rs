//! Periodic removal of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::lifecycle::Shutdown;
use crate::session::SessionStore;

/// Background task bounding session memory between accesses.
pub struct SessionSweeper {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Sweep on every tick until shutdown.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Session sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.store.cleanup();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.store.len(), "Expired sessions swept");
                    }
                }
                _ = shutdown.wait() => {
                    tracing::info!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
