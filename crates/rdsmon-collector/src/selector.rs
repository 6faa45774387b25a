//! Choosing which log streams a scrape polls.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use rdsmon_core::{LogProvider, ProviderError, ResourceId};

/// Resolves the set of streams for one scrape.
#[derive(Clone)]
pub struct StreamSelector {
    logs: Arc<dyn LogProvider>,
    activity_window: Duration,
}

impl StreamSelector {
    pub fn new(logs: Arc<dyn LogProvider>, activity_window: Duration) -> Self {
        Self {
            logs,
            activity_window,
        }
    }

    /// With `target`, only that stream. Otherwise every stream with an event
    /// inside the activity window ending at `now_ms`, most recent first.
    ///
    /// A missing log group yields no streams.
    pub async fn select(
        &self,
        target: Option<&str>,
        now_ms: i64,
    ) -> Result<Vec<ResourceId>, ProviderError> {
        if let Some(target) = target {
            return Ok(vec![target.to_string()]);
        }

        let window_ms = i64::try_from(self.activity_window.as_millis()).unwrap_or(i64::MAX);
        let since = now_ms.saturating_sub(window_ms);
        match self.logs.list_active_streams(since).await {
            Ok(active) => Ok(active.into_iter().map(|s| s.stream_id).collect()),
            Err(e) if e.is_not_found() => {
                info!(error = %e, "log group not found, nothing to collect");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdsmon_core::MemoryLogs;

    const HOUR: Duration = Duration::from_secs(3600);
    const NOW: i64 = 10 * 3_600_000;

    fn logs() -> Arc<MemoryLogs> {
        let logs = Arc::new(MemoryLogs::new());
        logs.push_event("stale", NOW - 2 * 3_600_000, "{}");
        logs.push_event("recent", NOW - 60_000, "{}");
        logs.push_event("newest", NOW - 1_000, "{}");
        logs
    }

    #[tokio::test]
    async fn explicit_target_skips_listing() {
        let selector = StreamSelector::new(logs(), HOUR);
        let streams = selector.select(Some("db-unknown"), NOW).await.unwrap();
        assert_eq!(streams, vec!["db-unknown".to_string()]);
    }

    #[tokio::test]
    async fn active_window_filters_stale_streams() {
        let selector = StreamSelector::new(logs(), HOUR);
        let streams = selector.select(None, NOW).await.unwrap();
        assert_eq!(streams, vec!["newest".to_string(), "recent".to_string()]);
    }

    #[tokio::test]
    async fn missing_group_yields_no_streams() {
        let logs = logs();
        logs.set_group_missing(true);
        let selector = StreamSelector::new(logs, HOUR);
        assert!(selector.select(None, NOW).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_active_streams_is_empty() {
        let selector = StreamSelector::new(Arc::new(MemoryLogs::new()), HOUR);
        assert!(selector.select(None, NOW).await.unwrap().is_empty());
    }
}
