//! Periodic inventory refresh.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::cache::InventoryCache;

/// Background task that refreshes an [`InventoryCache`] on a fixed interval.
pub struct Refresher {
    cache: InventoryCache,
    interval: Duration,
}

impl Refresher {
    pub fn new(cache: InventoryCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Run until `shutdown` changes. Failures are logged and retried on the
    /// next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "inventory refresher started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.cache.refresh().await {
                        Ok(stats) => info!(
                            resources = stats.resources_fetched,
                            cached = stats.resources_cached,
                            "inventory refresh complete"
                        ),
                        Err(e) => warn!(error = %e, "inventory refresh failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("inventory refresher shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rdsmon_core::{MemoryInventory, ResourceRecord};

    fn provider() -> Arc<MemoryInventory> {
        let p = Arc::new(MemoryInventory::new());
        p.put_resource(ResourceRecord {
            resource_id: "db-A".to_string(),
            identifier: "AAA".to_string(),
            ..Default::default()
        });
        p
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_each_interval() {
        let p = provider();
        let cache = InventoryCache::new(p.clone());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Refresher::new(cache.clone(), Duration::from_secs(300)).run(rx));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(p.resource_calls(), 0);
        assert!(cache.lookup("db-A").is_none());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(p.resource_calls(), 1);
        assert!(cache.lookup("db-A").is_some());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(p.resource_calls(), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_running_and_recovers() {
        let p = provider();
        p.fail_with("throttled");
        let cache = InventoryCache::new(p.clone());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Refresher::new(cache.clone(), Duration::from_secs(60)).run(rx));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(p.resource_calls(), 1);
        assert!(cache.lookup("db-A").is_none());

        p.clear_failure();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(cache.lookup("db-A").is_some());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_shutdown() {
        let cache = InventoryCache::new(provider());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Refresher::new(cache, Duration::from_secs(3600)).run(rx));
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
