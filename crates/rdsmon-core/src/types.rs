//! Inventory and log-event types shared across rdsmon crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable resource id of a database instance. Doubles as the name of the
/// instance's log stream in the `RDSOSMetrics` group.
pub type ResourceId = String;

/// Tag key → tag value for one database instance.
pub type TagSet = BTreeMap<String, String>;

// ── Inventory ──────────────────────────────────────────────────────

/// A database instance as reported by the inventory provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub resource_id: ResourceId,
    /// Human-readable instance identifier.
    pub identifier: String,
    #[serde(default)]
    pub instance_class: Option<String>,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// VPC of the instance's subnet group.
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub engine_version: Option<String>,
    /// Identifier of the instance this one replicates from.
    #[serde(default)]
    pub replica_source: Option<String>,
    #[serde(default)]
    pub cluster_identifier: Option<String>,
}

impl ResourceRecord {
    /// Classify this record's engine.
    pub fn engine_family(&self) -> EngineFamily {
        self.engine
            .as_deref()
            .map(EngineFamily::of)
            .unwrap_or(EngineFamily::Other)
    }
}

/// How an engine organizes its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    /// Cluster-based engines with writer/reader members (Aurora).
    Clustered,
    /// Standalone engines that support read replicas.
    Replicable,
    Other,
}

impl EngineFamily {
    pub fn of(engine: &str) -> Self {
        match engine {
            "aurora" | "aurora-mysql" | "aurora-postgresql" => EngineFamily::Clustered,
            "mysql" | "mariadb" | "postgres" => EngineFamily::Replicable,
            _ => EngineFamily::Other,
        }
    }
}

/// Cluster membership fact for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub identifier: String,
    pub is_writer: bool,
}

/// Tags attached to one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedResource {
    pub identifier: String,
    #[serde(default)]
    pub tags: TagSet,
}

// ── Log streams ────────────────────────────────────────────────────

/// A log stream and the time of its most recent event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamActivity {
    pub stream_id: String,
    /// Epoch milliseconds.
    pub last_event_ms: i64,
}

/// One raw event from a log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    /// Raw JSON payload.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(engine: Option<&str>) -> ResourceRecord {
        ResourceRecord {
            resource_id: "db-1".to_string(),
            identifier: "one".to_string(),
            instance_class: None,
            storage_type: None,
            availability_zone: None,
            vpc_id: None,
            engine: engine.map(str::to_string),
            engine_version: None,
            replica_source: None,
            cluster_identifier: None,
        }
    }

    #[test]
    fn engine_families() {
        assert_eq!(record(Some("aurora")).engine_family(), EngineFamily::Clustered);
        assert_eq!(record(Some("aurora-mysql")).engine_family(), EngineFamily::Clustered);
        assert_eq!(record(Some("mysql")).engine_family(), EngineFamily::Replicable);
        assert_eq!(record(Some("sqlserver-ex")).engine_family(), EngineFamily::Other);
        assert_eq!(record(None).engine_family(), EngineFamily::Other);
    }

    #[test]
    fn record_optional_fields_default_to_none() {
        let json = r#"{"resource_id": "db-1", "identifier": "one"}"#;
        let parsed: ResourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, record(None));
    }
}
