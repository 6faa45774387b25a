//! Provider traits: seams to the cloud APIs.
//!
//! The exporter never talks to a cloud SDK directly. Inventory and log
//! data arrive through these traits, so tests and fixture mode can inject
//! in-memory implementations. Pagination is the provider's concern: every
//! list call returns the complete result.

use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderResult;
use crate::types::{ClusterMember, LogEvent, ResourceRecord, StreamActivity, TaggedResource};

/// Boxed future alias for provider calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = ProviderResult<T>> + Send + 'a>>;

/// Source of database inventory, cluster membership, and tags.
pub trait InventoryProvider: Send + Sync {
    /// List every database instance.
    fn list_resources(&self) -> ProviderFuture<'_, Vec<ResourceRecord>>;

    /// List writer/reader membership of every clustered instance.
    fn list_cluster_members(&self) -> ProviderFuture<'_, Vec<ClusterMember>>;

    /// List tags of every database instance.
    fn list_tagged_resources(&self) -> ProviderFuture<'_, Vec<TaggedResource>>;
}

/// Source of enhanced monitoring log events.
pub trait LogProvider: Send + Sync {
    /// List streams whose last event is at or after `active_since_ms`,
    /// most recently active first.
    fn list_active_streams(&self, active_since_ms: i64) -> ProviderFuture<'_, Vec<StreamActivity>>;

    /// Fetch up to `limit` events of `stream_id`, most recent first.
    ///
    /// With `after_ms`, only events strictly newer than it are returned.
    fn fetch_events<'a>(
        &'a self,
        stream_id: &'a str,
        after_ms: Option<i64>,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<LogEvent>>;
}
