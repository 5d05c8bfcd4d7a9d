//! Background Expiry Reaper
//!
//! A background task that periodically sweeps the store and evicts expired
//! entries. Lookups already filter expired values on access, but a key that
//! expires and is never read again would otherwise sit in memory until the
//! process exits. The reaper bounds that memory.
//!
//! The sweep runs on a fixed interval (30 seconds by default) and takes the
//! store's write lock for the duration of one pass.

use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Default interval between sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// A handle to the running reaper task.
///
/// Dropping the handle stops the task, so the reaper's lifetime is tied to
/// whoever owns it (normally `main`, for the life of the process).
#[derive(Debug)]
pub struct Reaper {
    shutdown_tx: watch::Sender<bool>,
}

impl Reaper {
    /// Starts the reaper as a background task sweeping `store` every
    /// `interval`.
    pub fn start(store: Arc<Store>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(reaper_loop(store, interval, shutdown_rx));

        info!(interval_secs = interval.as_secs(), "Expiry reaper started");

        Self { shutdown_tx }
    }

    /// Stops the reaper. Called automatically on drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts the reaper with the default sweep interval.
pub fn start_reaper(store: Arc<Store>) -> Reaper {
    Reaper::start(store, SWEEP_INTERVAL)
}

async fn reaper_loop(store: Arc<Store>, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry reaper received shutdown signal");
                    return;
                }
            }
        }

        let swept = store.sweep_expired();
        if swept > 0 {
            debug!(
                swept = swept,
                keys_remaining = store.len(),
                "Expired keys reclaimed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reaper_evicts_expired_keys() {
        let store = Arc::new(Store::new());

        for i in 0..10 {
            store.set_ex(format!("key{}", i), "value", Duration::from_millis(50));
        }
        store.set("persistent", "value");

        assert_eq!(store.len(), 11);

        let _reaper = Reaper::start(Arc::clone(&store), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Only the persistent key is physically left.
        assert_eq!(store.len(), 1);
        assert!(store.get("persistent").is_some());
    }

    #[tokio::test]
    async fn test_reaper_stops_on_drop() {
        let store = Arc::new(Store::new());

        {
            let _reaper = Reaper::start(Arc::clone(&store), Duration::from_millis(10));
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Reaper is dropped here
        }

        store.set_ex("key", "value", Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The stopped reaper no longer sweeps, the entry remains in the map.
        assert_eq!(store.len(), 1);
        // But lookups still treat it as absent.
        assert!(store.get("key").is_none());
    }
}
