//! Exporter configuration file parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Region used when neither the config file nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub targets: Vec<Target>,
    pub inventory: InventoryConfig,
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Interval between inventory refreshes, e.g. `"5m"`.
    pub refresh_interval: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            refresh_interval: "5m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Maximum concurrently running stream fetches per scrape.
    pub max_in_flight: usize,
    /// Minimum time between fetch starts on one concurrency slot.
    pub pace: String,
    /// Maximum events fetched per stream per scrape.
    pub fetch_limit: usize,
    /// Streams idle for longer than this are not polled.
    pub activity_window: String,
    pub on_stream_error: StreamErrorPolicy,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            pace: "1s".to_string(),
            fetch_limit: 3,
            activity_window: "1h".to_string(),
            on_stream_error: StreamErrorPolicy::Fail,
        }
    }
}

/// What a scrape does when one stream's fetch or decode fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorPolicy {
    /// Abort the whole scrape with a server error.
    #[default]
    Fail,
    /// Log the failure and drop only that stream's output.
    Skip,
}

impl ExporterConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every duration parses and every count is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.refresh_interval()?;
        self.pace()?;
        self.activity_window()?;
        if self.scrape.max_in_flight == 0 {
            return Err(ConfigError::Zero { field: "scrape.max_in_flight" });
        }
        if self.scrape.fetch_limit == 0 {
            return Err(ConfigError::Zero { field: "scrape.fetch_limit" });
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        duration_field("inventory.refresh_interval", &self.inventory.refresh_interval)
    }

    pub fn pace(&self) -> Result<Duration, ConfigError> {
        duration_field("scrape.pace", &self.scrape.pace)
    }

    pub fn activity_window(&self) -> Result<Duration, ConfigError> {
        duration_field("scrape.activity_window", &self.scrape.activity_window)
    }

    /// Resolve the region once at startup: first configured target, then
    /// the `AWS_REGION` value passed in, then [`DEFAULT_REGION`].
    pub fn resolve_region(&self, env_region: Option<String>) -> String {
        self.targets
            .first()
            .map(|t| t.region.clone())
            .filter(|r| !r.is_empty())
            .or_else(|| env_region.filter(|r| !r.is_empty()))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

fn duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Parse `"500ms"`, `"1s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse::<u64>().ok().map(Duration::from_millis);
    }
    let (digits, scale) = if let Some(v) = s.strip_suffix('s') {
        (v, 1)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3600)
    } else {
        return None;
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .map(Duration::from_secs)
}
