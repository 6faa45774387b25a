//! In-memory providers.
//!
//! `MemoryInventory` and `MemoryLogs` implement the provider traits over
//! plain maps. Tests drive them directly; the daemon loads them from a JSON
//! [`Fixture`] when no cloud backend is wired in.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Deserialize;

use crate::LOG_GROUP;
use crate::config::ConfigError;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{InventoryProvider, LogProvider, ProviderFuture};
use crate::types::*;

// ── Inventory ──────────────────────────────────────────────────────

#[derive(Default)]
struct InventoryData {
    resources: BTreeMap<ResourceId, ResourceRecord>,
    members: BTreeMap<String, bool>,
    tags: BTreeMap<String, TagSet>,
    failure: Option<String>,
}

/// Inventory provider backed by in-memory maps.
#[derive(Default)]
pub struct MemoryInventory {
    data: RwLock<InventoryData>,
    calls: AtomicUsize,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_resource(&self, record: ResourceRecord) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.resources.insert(record.resource_id.clone(), record);
    }

    pub fn remove_resource(&self, resource_id: &str) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.resources.remove(resource_id);
    }

    pub fn put_member(&self, identifier: &str, is_writer: bool) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.members.insert(identifier.to_string(), is_writer);
    }

    pub fn put_tags(&self, identifier: &str, tags: TagSet) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.tags.insert(identifier.to_string(), tags);
    }

    /// Make every subsequent call fail with `message` until cleared.
    pub fn fail_with(&self, message: &str) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.failure = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.failure = None;
    }

    /// Number of `list_resources` calls served so far.
    pub fn resource_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn read<T>(&self, f: impl FnOnce(&InventoryData) -> T) -> ProviderResult<T> {
        let data = self.data.read().map_err(poisoned)?;
        match &data.failure {
            Some(message) => Err(ProviderError::Request(message.clone())),
            None => Ok(f(&data)),
        }
    }
}

impl InventoryProvider for MemoryInventory {
    fn list_resources(&self) -> ProviderFuture<'_, Vec<ResourceRecord>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = self.read(|d| d.resources.values().cloned().collect());
        Box::pin(async move { result })
    }

    fn list_cluster_members(&self) -> ProviderFuture<'_, Vec<ClusterMember>> {
        let result = self.read(|d| {
            d.members
                .iter()
                .map(|(identifier, &is_writer)| ClusterMember {
                    identifier: identifier.clone(),
                    is_writer,
                })
                .collect()
        });
        Box::pin(async move { result })
    }

    fn list_tagged_resources(&self) -> ProviderFuture<'_, Vec<TaggedResource>> {
        let result = self.read(|d| {
            d.tags
                .iter()
                .map(|(identifier, tags)| TaggedResource {
                    identifier: identifier.clone(),
                    tags: tags.clone(),
                })
                .collect()
        });
        Box::pin(async move { result })
    }
}

/// A panic while a lock was held leaves the data suspect; report it like
/// any failed backend call.
fn poisoned<T>(_: PoisonError<T>) -> ProviderError {
    ProviderError::Request("in-memory provider lock poisoned".to_string())
}

// ── Logs ───────────────────────────────────────────────────────────

#[derive(Default)]
struct LogData {
    streams: BTreeMap<String, Vec<LogEvent>>,
    failing_streams: HashMap<String, String>,
    group_missing: bool,
}

/// A recorded `fetch_events` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub stream_id: String,
    pub after_ms: Option<i64>,
    pub limit: usize,
}

/// Log provider backed by in-memory event lists.
///
/// Records every fetch and tracks the peak number of concurrent fetches,
/// optionally delaying each fetch by a fixed latency.
#[derive(Default)]
pub struct MemoryLogs {
    data: RwLock<LogData>,
    fetches: Mutex<Vec<FetchCall>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_event(&self, stream_id: &str, timestamp_ms: i64, message: impl Into<String>) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.streams
            .entry(stream_id.to_string())
            .or_default()
            .push(LogEvent {
                timestamp_ms,
                message: message.into(),
            });
    }

    /// Make fetches of `stream_id` fail with `message`.
    pub fn fail_stream(&self, stream_id: &str, message: &str) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.failing_streams
            .insert(stream_id.to_string(), message.to_string());
    }

    /// Simulate the log group not existing.
    pub fn set_group_missing(&self, missing: bool) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.group_missing = missing;
    }

    /// Every fetch served so far, in call order.
    pub fn fetches(&self) -> Vec<FetchCall> {
        self.fetches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Highest number of fetches observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn select_events(
        &self,
        stream_id: &str,
        after_ms: Option<i64>,
        limit: usize,
    ) -> ProviderResult<Vec<LogEvent>> {
        let data = self.data.read().map_err(poisoned)?;
        if data.group_missing {
            return Err(ProviderError::NotFound(LOG_GROUP.to_string()));
        }
        if let Some(message) = data.failing_streams.get(stream_id) {
            return Err(ProviderError::Request(message.clone()));
        }
        let Some(events) = data.streams.get(stream_id) else {
            return Err(ProviderError::NotFound(format!("{LOG_GROUP}/{stream_id}")));
        };
        let mut selected: Vec<LogEvent> = events
            .iter()
            .filter(|e| after_ms.is_none_or(|after| e.timestamp_ms > after))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        selected.truncate(limit);
        Ok(selected)
    }
}

impl LogProvider for MemoryLogs {
    fn list_active_streams(&self, active_since_ms: i64) -> ProviderFuture<'_, Vec<StreamActivity>> {
        let result = match self.data.read() {
            Err(e) => Err(poisoned(e)),
            Ok(data) if data.group_missing => {
                Err(ProviderError::NotFound(LOG_GROUP.to_string()))
            }
            Ok(data) => {
                let mut active: Vec<StreamActivity> = data
                    .streams
                    .iter()
                    .filter_map(|(stream_id, events)| {
                        let last = events.iter().map(|e| e.timestamp_ms).max()?;
                        (last >= active_since_ms).then(|| StreamActivity {
                            stream_id: stream_id.clone(),
                            last_event_ms: last,
                        })
                    })
                    .collect();
                active.sort_by(|a, b| b.last_event_ms.cmp(&a.last_event_ms));
                Ok(active)
            }
        };
        Box::pin(async move { result })
    }

    fn fetch_events<'a>(
        &'a self,
        stream_id: &'a str,
        after_ms: Option<i64>,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<LogEvent>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            self.fetches.lock().unwrap_or_else(PoisonError::into_inner).push(FetchCall {
                stream_id: stream_id.to_string(),
                after_ms,
                limit,
            });
            let result = self.select_events(stream_id, after_ms, limit);

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

// ── Fixture ────────────────────────────────────────────────────────

/// JSON document describing a complete inventory plus log streams.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub resources: Vec<ResourceRecord>,
    pub members: Vec<ClusterMember>,
    pub tags: Vec<TaggedResource>,
    pub streams: Vec<FixtureStream>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureStream {
    pub stream_id: String,
    #[serde(default)]
    pub events: Vec<FixtureEvent>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureEvent {
    pub timestamp_ms: i64,
    /// Either the raw payload string or the payload as a JSON object.
    pub message: serde_json::Value,
}

impl Fixture {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn into_providers(self) -> (MemoryInventory, MemoryLogs) {
        let inventory = MemoryInventory::new();
        for record in self.resources {
            inventory.put_resource(record);
        }
        for member in self.members {
            inventory.put_member(&member.identifier, member.is_writer);
        }
        for tagged in self.tags {
            inventory.put_tags(&tagged.identifier, tagged.tags);
        }

        let logs = MemoryLogs::new();
        for stream in self.streams {
            for event in stream.events {
                let message = match event.message {
                    serde_json::Value::String(raw) => raw,
                    other => other.to_string(),
                };
                logs.push_event(&stream.stream_id, event.timestamp_ms, message);
            }
        }
        (inventory, logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_returns_newest_first_and_respects_limit() {
        let logs = MemoryLogs::new();
        for ts in [1000, 3000, 2000, 4000] {
            logs.push_event("db-1", ts, "{}");
        }

        let events = logs.fetch_events("db-1", None, 3).await.unwrap();
        let stamps: Vec<i64> = events.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![4000, 3000, 2000]);

        let events = logs.fetch_events("db-1", Some(3000), 3).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp_ms, 4000);

        assert_eq!(logs.fetches().len(), 2);
        assert_eq!(logs.fetches()[1].after_ms, Some(3000));
    }

    #[tokio::test]
    async fn active_streams_filtered_by_window() {
        let logs = MemoryLogs::new();
        logs.push_event("old", 1_000, "{}");
        logs.push_event("new", 9_000, "{}");

        let active = logs.list_active_streams(5_000).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].stream_id, "new");
    }

    #[tokio::test]
    async fn missing_group_is_not_found() {
        let logs = MemoryLogs::new();
        logs.set_group_missing(true);
        let err = logs.list_active_streams(0).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn inventory_failure_injection() {
        let inventory = MemoryInventory::new();
        inventory.fail_with("throttled");
        assert!(inventory.list_resources().await.is_err());
        inventory.clear_failure();
        assert!(inventory.list_resources().await.unwrap().is_empty());
        assert_eq!(inventory.resource_calls(), 2);
    }

    fn poison<T: Send + Sync>(lock: &RwLock<T>) {
        let outcome = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = lock.write();
                panic!("writer died holding the lock");
            })
            .join()
        });
        assert!(outcome.is_err());
        assert!(lock.is_poisoned());
    }

    #[tokio::test]
    async fn poisoned_locks_fail_calls_instead_of_panicking() {
        let inventory = MemoryInventory::new();
        poison(&inventory.data);
        let err = inventory.list_resources().await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(ref m) if m.contains("poisoned")));
        assert!(inventory.list_cluster_members().await.is_err());
        inventory.put_resource(ResourceRecord::default());

        let logs = MemoryLogs::new();
        logs.push_event("db-1", 1000, "{}");
        poison(&logs.data);
        let err = logs.list_active_streams(0).await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
        let err = logs.fetch_events("db-1", None, 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
        assert_eq!(logs.fetches().len(), 1);
    }

    #[tokio::test]
    async fn fixture_accepts_object_and_string_payloads() {
        let json = r#"{
            "resources": [{"resource_id": "db-A", "identifier": "AAA", "engine": "mysql"}],
            "members": [{"identifier": "AAA", "is_writer": true}],
            "tags": [{"identifier": "AAA", "tags": {"Environment": "production"}}],
            "streams": [{"stream_id": "db-A", "events": [
                {"timestamp_ms": 1, "message": {"numVCPUs": 2}},
                {"timestamp_ms": 2, "message": "{\"numVCPUs\": 4}"}
            ]}]
        }"#;
        let fixture: Fixture = serde_json::from_str(json).unwrap();
        let (inventory, logs) = fixture.into_providers();

        assert_eq!(inventory.list_resources().await.unwrap().len(), 1);
        assert_eq!(inventory.list_cluster_members().await.unwrap()[0].is_writer, true);

        let events = logs.fetch_events("db-A", None, 10).await.unwrap();
        assert_eq!(events[0].message, "{\"numVCPUs\": 4}");
        assert_eq!(events[1].message, "{\"numVCPUs\":2}");
    }
}
