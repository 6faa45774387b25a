//! Incremental, paced collection of one scrape.
//!
//! Every selected stream gets its own task. A per-scrape semaphore bounds how
//! many run at once, and each permit is held until `pace` has passed since
//! its task started, so one slot starts at most one fetch per `pace`.
//! Dropping the future returned by [`IncrementalCollector::collect`] drops
//! the task set, which aborts every pending fetch.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

use rdsmon_core::{
    ConfigError, ExporterConfig, LogProvider, NAMESPACE, ProviderError, StreamErrorPolicy,
};
use rdsmon_exposition::{LabelSet, Series, decode_snapshot, flatten};
use rdsmon_inventory::InventoryCache;

use crate::labels::LabelRequest;
use crate::selector::StreamSelector;
use crate::watermark::HighWaterMarks;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to list log streams: {0}")]
    StreamList(#[source] ProviderError),

    #[error("failed to fetch events of {stream}: {source}")]
    StreamFetch {
        stream: String,
        source: ProviderError,
    },

    #[error("failed to decode event of {stream}: {source}")]
    Decode {
        stream: String,
        source: serde_json::Error,
    },

    #[error("collection task failed: {0}")]
    Task(#[from] JoinError),

    #[error("scrape cancelled")]
    Cancelled,
}

/// Tuning for one collector.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorSettings {
    pub max_in_flight: usize,
    pub pace: Duration,
    pub fetch_limit: usize,
    pub activity_window: Duration,
    pub on_stream_error: StreamErrorPolicy,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            pace: Duration::from_secs(1),
            fetch_limit: 3,
            activity_window: Duration::from_secs(3600),
            on_stream_error: StreamErrorPolicy::Fail,
        }
    }
}

impl CollectorSettings {
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_in_flight: config.scrape.max_in_flight.max(1),
            pace: config.pace()?,
            fetch_limit: config.scrape.fetch_limit.max(1),
            activity_window: config.activity_window()?,
            on_stream_error: config.scrape.on_stream_error,
        })
    }
}

/// One scrape as seen by the collector.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// Caller identity; high-water marks are kept per caller.
    pub caller: String,
    /// Poll only this stream instead of every active one.
    pub resource_id: Option<String>,
    pub labels: LabelRequest,
}

struct Inner {
    inventory: InventoryCache,
    logs: Arc<dyn LogProvider>,
    selector: StreamSelector,
    marks: HighWaterMarks,
    settings: CollectorSettings,
}

/// Shared collector handle. Cheap to clone.
#[derive(Clone)]
pub struct IncrementalCollector {
    inner: Arc<Inner>,
}

impl IncrementalCollector {
    pub fn new(
        inventory: InventoryCache,
        logs: Arc<dyn LogProvider>,
        settings: CollectorSettings,
    ) -> Self {
        let selector = StreamSelector::new(logs.clone(), settings.activity_window);
        Self {
            inner: Arc::new(Inner {
                inventory,
                logs,
                selector,
                marks: HighWaterMarks::new(),
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.inner.settings
    }

    pub fn marks(&self) -> &HighWaterMarks {
        &self.inner.marks
    }

    /// Collect new events for `request` using the wall clock.
    pub async fn collect(&self, request: &ScrapeRequest) -> Result<Vec<Series>, CollectError> {
        self.collect_at(request, now_ms()).await
    }

    /// Collect new events for `request`, selecting active streams relative
    /// to `now_ms`.
    pub async fn collect_at(
        &self,
        request: &ScrapeRequest,
        now_ms: i64,
    ) -> Result<Vec<Series>, CollectError> {
        let streams = self
            .inner
            .selector
            .select(request.resource_id.as_deref(), now_ms)
            .await
            .map_err(CollectError::StreamList)?;
        if streams.is_empty() {
            return Ok(Vec::new());
        }

        let inventory = self.inner.inventory.snapshot();
        let settings = &self.inner.settings;
        let slots = Arc::new(Semaphore::new(settings.max_in_flight));
        let mut tasks = JoinSet::new();

        for stream in streams {
            let Some(record) = inventory.lookup(&stream) else {
                warn!(stream = %stream, "stream has no inventory entry, skipping");
                continue;
            };
            let labels = request.labels.assemble(record, &inventory);
            let inner = self.inner.clone();
            let slots = slots.clone();
            let caller = request.caller.clone();

            tasks.spawn(async move {
                let permit = slots
                    .acquire_owned()
                    .await
                    .map_err(|_| CollectError::Cancelled)?;
                let started = Instant::now();
                let result = collect_stream(&inner, &caller, &stream, &labels).await;
                release_after(permit, started + inner.settings.pace);
                result
            });
        }

        debug!(caller = %request.caller, streams = tasks.len(), "collecting");

        let mut batches = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                Ok(batch) => batches.push(batch),
                Err(e) => match settings.on_stream_error {
                    StreamErrorPolicy::Fail => return Err(e),
                    StreamErrorPolicy::Skip => {
                        warn!(error = %e, "dropping stream from scrape");
                    }
                },
            }
        }

        // Marks move only once the scrape's output is certain to be returned.
        let mut out = Vec::new();
        for batch in batches {
            if let Some(newest) = batch.newest_ms {
                self.inner.marks.advance(&request.caller, &batch.stream, newest);
            }
            out.extend(batch.series);
        }
        Ok(out)
    }
}

/// Output of one stream, with the mark it earns once delivered.
struct StreamBatch {
    stream: String,
    series: Vec<Series>,
    newest_ms: Option<i64>,
}

async fn collect_stream(
    inner: &Inner,
    caller: &str,
    stream: &str,
    labels: &LabelSet,
) -> Result<StreamBatch, CollectError> {
    let mut batch = StreamBatch {
        stream: stream.to_string(),
        series: Vec::new(),
        newest_ms: None,
    };

    let after = inner.marks.get(caller, stream);
    let events = match inner
        .logs
        .fetch_events(stream, after, inner.settings.fetch_limit)
        .await
    {
        Ok(events) => events,
        Err(e) if e.is_not_found() => {
            debug!(stream, error = %e, "stream not found");
            return Ok(batch);
        }
        Err(source) => {
            return Err(CollectError::StreamFetch {
                stream: stream.to_string(),
                source,
            });
        }
    };

    if events.is_empty() {
        debug!(stream, "no new events");
        return Ok(batch);
    }

    for event in &events {
        let snapshot =
            decode_snapshot(&event.message).map_err(|source| CollectError::Decode {
                stream: stream.to_string(),
                source,
            })?;
        batch
            .series
            .extend(flatten(&snapshot, NAMESPACE, labels, event.timestamp_ms));
        batch.newest_ms = batch.newest_ms.max(Some(event.timestamp_ms));
    }
    Ok(batch)
}

/// Hold `permit` until `deadline`, without blocking the caller.
fn release_after(permit: OwnedSemaphorePermit, deadline: Instant) {
    if Instant::now() >= deadline {
        return;
    }
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        drop(permit);
    });
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
