//! Inventory cache with copy-on-write snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use rdsmon_core::{InventoryProvider, ProviderError, ResourceId, ResourceRecord, TagSet};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to list {what}: {source}")]
    Fetch {
        what: &'static str,
        source: ProviderError,
    },
}

/// One consistent view of the inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    /// resource id → record.
    pub resources: HashMap<ResourceId, ResourceRecord>,
    /// instance identifier → is cluster writer.
    pub members: HashMap<String, bool>,
    /// instance identifier → tags.
    pub tags: HashMap<String, TagSet>,
}

impl Inventory {
    pub fn lookup(&self, resource_id: &str) -> Option<&ResourceRecord> {
        self.resources.get(resource_id)
    }

    pub fn lookup_membership(&self, identifier: &str) -> Option<bool> {
        self.members.get(identifier).copied()
    }

    pub fn lookup_tags(&self, identifier: &str) -> Option<&TagSet> {
        self.tags.get(identifier)
    }
}

/// Counts from one successful refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub resources_fetched: usize,
    pub members_fetched: usize,
    pub tagged_fetched: usize,
    /// Resources held after the merge, including ones no longer reported.
    pub resources_cached: usize,
}

struct Shared {
    snapshot: ArcSwap<Inventory>,
    provider: Arc<dyn InventoryProvider>,
    /// Serializes merges; never held across a provider call.
    writer: Mutex<()>,
}

/// Shared handle to the inventory. Cheap to clone.
#[derive(Clone)]
pub struct InventoryCache {
    inner: Arc<Shared>,
}

impl InventoryCache {
    /// Create an empty cache fed by `provider`.
    pub fn new(provider: Arc<dyn InventoryProvider>) -> Self {
        Self {
            inner: Arc::new(Shared {
                snapshot: ArcSwap::from_pointee(Inventory::default()),
                provider,
                writer: Mutex::new(()),
            }),
        }
    }

    /// Fetch the full inventory and merge it into the cache.
    ///
    /// On error the cache is left untouched.
    pub async fn refresh(&self) -> Result<RefreshStats, InventoryError> {
        let provider = &self.inner.provider;
        let resources = provider
            .list_resources()
            .await
            .map_err(|source| InventoryError::Fetch { what: "resources", source })?;
        let members = provider
            .list_cluster_members()
            .await
            .map_err(|source| InventoryError::Fetch { what: "cluster members", source })?;
        let tagged = provider
            .list_tagged_resources()
            .await
            .map_err(|source| InventoryError::Fetch { what: "tagged resources", source })?;

        let mut stats = RefreshStats {
            resources_fetched: resources.len(),
            members_fetched: members.len(),
            tagged_fetched: tagged.len(),
            resources_cached: 0,
        };

        let _writer = self.inner.writer.lock().await;
        let current = self.inner.snapshot.load_full();
        let mut next = Inventory::clone(&current);
        for record in resources {
            next.resources.insert(record.resource_id.clone(), record);
        }
        for member in members {
            next.members.insert(member.identifier, member.is_writer);
        }
        for entry in tagged {
            next.tags.insert(entry.identifier, entry.tags);
        }
        stats.resources_cached = next.resources.len();
        self.inner.snapshot.store(Arc::new(next));

        debug!(
            resources = stats.resources_fetched,
            members = stats.members_fetched,
            tagged = stats.tagged_fetched,
            cached = stats.resources_cached,
            "inventory refreshed"
        );
        Ok(stats)
    }

    /// Current snapshot. Holding it does not block refreshes.
    pub fn snapshot(&self) -> Arc<Inventory> {
        self.inner.snapshot.load_full()
    }

    pub fn lookup(&self, resource_id: &str) -> Option<ResourceRecord> {
        self.inner.snapshot.load().lookup(resource_id).cloned()
    }

    pub fn lookup_membership(&self, identifier: &str) -> Option<bool> {
        self.inner.snapshot.load().lookup_membership(identifier)
    }

    pub fn lookup_tags(&self, identifier: &str) -> Option<TagSet> {
        self.inner.snapshot.load().lookup_tags(identifier).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdsmon_core::MemoryInventory;

    fn record(resource_id: &str, identifier: &str) -> ResourceRecord {
        ResourceRecord {
            resource_id: resource_id.to_string(),
            identifier: identifier.to_string(),
            instance_class: Some("db.t2.meduim".to_string()),
            storage_type: Some("gp2".to_string()),
            availability_zone: Some("us-east-1a".to_string()),
            vpc_id: Some("vpc-aaaaaaaa".to_string()),
            engine: Some("mysql".to_string()),
            engine_version: Some("5.7".to_string()),
            replica_source: None,
            cluster_identifier: None,
        }
    }

    fn provider() -> Arc<MemoryInventory> {
        let p = Arc::new(MemoryInventory::new());
        p.put_resource(record("db-A", "AAA"));
        p.put_resource(record("db-B", "BBB"));
        p.put_member("AAA", true);
        p.put_member("BBB", false);
        p.put_tags("AAA", TagSet::from([("Environment".to_string(), "production".to_string())]));
        p
    }

    #[tokio::test]
    async fn starts_empty() {
        let cache = InventoryCache::new(provider());
        assert!(cache.lookup("db-A").is_none());
        assert_eq!(*cache.snapshot(), Inventory::default());
    }

    #[tokio::test]
    async fn refresh_populates_all_maps() {
        let cache = InventoryCache::new(provider());
        let stats = cache.refresh().await.unwrap();
        assert_eq!(stats.resources_fetched, 2);
        assert_eq!(stats.members_fetched, 2);
        assert_eq!(stats.tagged_fetched, 1);

        assert_eq!(cache.lookup("db-A").unwrap().identifier, "AAA");
        assert_eq!(cache.lookup_membership("AAA"), Some(true));
        assert_eq!(cache.lookup_membership("BBB"), Some(false));
        assert_eq!(
            cache.lookup_tags("AAA").unwrap().get("Environment").map(String::as_str),
            Some("production")
        );
        assert!(cache.lookup_tags("BBB").is_none());
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let cache = InventoryCache::new(provider());
        cache.refresh().await.unwrap();
        let once = cache.snapshot();
        cache.refresh().await.unwrap();
        assert_eq!(*once, *cache.snapshot());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let p = provider();
        let cache = InventoryCache::new(p.clone());
        cache.refresh().await.unwrap();
        let before = cache.snapshot();

        p.fail_with("rate exceeded");
        let err = cache.refresh().await.unwrap_err();
        assert!(err.to_string().contains("rate exceeded"));
        assert_eq!(*before, *cache.snapshot());
        assert!(cache.lookup("db-A").is_some());
    }

    #[tokio::test]
    async fn vanished_resources_are_retained() {
        let p = provider();
        let cache = InventoryCache::new(p.clone());
        cache.refresh().await.unwrap();

        p.remove_resource("db-B");
        let stats = cache.refresh().await.unwrap();
        assert_eq!(stats.resources_fetched, 1);
        assert_eq!(stats.resources_cached, 2);
        assert!(cache.lookup("db-B").is_some());
    }

    #[tokio::test]
    async fn refresh_overwrites_changed_records() {
        let p = provider();
        let cache = InventoryCache::new(p.clone());
        cache.refresh().await.unwrap();

        let mut upgraded = record("db-A", "AAA");
        upgraded.engine_version = Some("8.0".to_string());
        p.put_resource(upgraded);
        p.put_member("AAA", false);
        cache.refresh().await.unwrap();

        assert_eq!(cache.lookup("db-A").unwrap().engine_version.as_deref(), Some("8.0"));
        assert_eq!(cache.lookup_membership("AAA"), Some(false));
    }

    #[tokio::test]
    async fn held_snapshot_is_not_mutated_by_refresh() {
        let p = provider();
        let cache = InventoryCache::new(p.clone());
        let empty = cache.snapshot();
        cache.refresh().await.unwrap();
        assert!(empty.resources.is_empty());
        assert_eq!(cache.snapshot().resources.len(), 2);
    }
}
