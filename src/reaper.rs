// Periodic purge of expired cache entries, independent of read traffic

use crate::cache::OfferCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

pub struct CacheReaper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CacheReaper {
    /// Spawns the sweep loop on the current runtime. The first sweep runs one
    /// interval after the call. Dropping the reaper also stops the loop.
    pub fn spawn(cache: Arc<dyn OfferCache>, every: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let every = every.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            info!(interval_secs = every.as_secs(), "cache reaper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        debug!(removed, "reaper pass done");
                    }
                    _ = stop.changed() => {
                        info!("cache reaper stopped");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
