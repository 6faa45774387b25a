//! rdsmon-core - shared types for the RDS enhanced monitoring exporter.
//!
//! Holds the inventory and log-event domain types, the provider traits the
//! rest of the workspace consumes, the exporter configuration, and in-memory
//! provider implementations used by tests and by the daemon's fixture mode.

pub mod config;
pub mod error;
pub mod memory;
pub mod provider;
pub mod types;

pub use config::{ConfigError, ExporterConfig, StreamErrorPolicy};
pub use error::{ProviderError, ProviderResult};
pub use memory::{Fixture, MemoryInventory, MemoryLogs};
pub use provider::{InventoryProvider, LogProvider, ProviderFuture};
pub use types::*;

/// Log group that carries enhanced monitoring events.
pub const LOG_GROUP: &str = "RDSOSMetrics";

/// Prefix prepended to every exported series name.
pub const NAMESPACE: &str = "rds_enhanced_monitoring_";
