//! Label assembly from inventory attributes.
//!
//! A scrape names the labels it wants (`labels[]=Engine&labels[]=tag_Team`).
//! Each name maps to an attribute of the stream's [`ResourceRecord`], to its
//! cluster membership, or to one of its tags. Names that do not resolve for a
//! given resource are left out rather than rendered empty.

use rdsmon_core::{EngineFamily, ResourceRecord};
use rdsmon_exposition::LabelSet;
use rdsmon_inventory::Inventory;

const TAG_PREFIX: &str = "tag_";

/// A recognised label name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelName {
    DbInstanceIdentifier,
    DbClusterIdentifier,
    DbInstanceClass,
    StorageType,
    AvailabilityZone,
    /// Requested as `DBSubnetGroup.VpcId`, rendered as `VpcId`.
    VpcId,
    Engine,
    EngineVersion,
    IsClusterWriter,
    RdsInstanceType,
    /// `tag_<Key>`; holds the tag key.
    Tag(String),
}

impl LabelName {
    /// Parse a requested name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let parsed = match name {
            "DBInstanceIdentifier" => LabelName::DbInstanceIdentifier,
            "DBClusterIdentifier" => LabelName::DbClusterIdentifier,
            "DBInstanceClass" => LabelName::DbInstanceClass,
            "StorageType" => LabelName::StorageType,
            "AvailabilityZone" => LabelName::AvailabilityZone,
            "DBSubnetGroup.VpcId" => LabelName::VpcId,
            "Engine" => LabelName::Engine,
            "EngineVersion" => LabelName::EngineVersion,
            "IsClusterWriter" => LabelName::IsClusterWriter,
            "RDSInstanceType" => LabelName::RdsInstanceType,
            other => match other.strip_prefix(TAG_PREFIX) {
                Some(key) if !key.is_empty() => LabelName::Tag(key.to_string()),
                _ => return None,
            },
        };
        Some(parsed)
    }

    /// Key used in the rendered label set.
    pub fn key(&self) -> String {
        match self {
            LabelName::DbInstanceIdentifier => "DBInstanceIdentifier".to_string(),
            LabelName::DbClusterIdentifier => "DBClusterIdentifier".to_string(),
            LabelName::DbInstanceClass => "DBInstanceClass".to_string(),
            LabelName::StorageType => "StorageType".to_string(),
            LabelName::AvailabilityZone => "AvailabilityZone".to_string(),
            LabelName::VpcId => "VpcId".to_string(),
            LabelName::Engine => "Engine".to_string(),
            LabelName::EngineVersion => "EngineVersion".to_string(),
            LabelName::IsClusterWriter => "IsClusterWriter".to_string(),
            LabelName::RdsInstanceType => "RDSInstanceType".to_string(),
            LabelName::Tag(key) => format!("{TAG_PREFIX}{key}"),
        }
    }
}

/// Ordered, de-duplicated list of requested labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRequest {
    names: Vec<LabelName>,
}

impl LabelRequest {
    /// Build from raw names. Unknown names and repeats are dropped; the
    /// first occurrence keeps its position.
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Vec::new();
        for name in raw {
            if let Some(parsed) = LabelName::parse(name.as_ref()) {
                if !names.contains(&parsed) {
                    names.push(parsed);
                }
            }
        }
        Self { names }
    }

    pub fn names(&self) -> &[LabelName] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve the requested labels for `record` against `inventory`.
    pub fn assemble(&self, record: &ResourceRecord, inventory: &Inventory) -> LabelSet {
        let mut labels = LabelSet::new();
        for name in &self.names {
            if let Some(value) = resolve(name, record, inventory) {
                labels.insert(name.key(), value);
            }
        }
        labels
    }
}

fn resolve(name: &LabelName, record: &ResourceRecord, inventory: &Inventory) -> Option<String> {
    let family = record.engine_family();
    let is_writer = || inventory.lookup_membership(&record.identifier);
    match name {
        LabelName::DbInstanceIdentifier => Some(record.identifier.clone()),
        LabelName::DbClusterIdentifier => match family {
            EngineFamily::Clustered => record.cluster_identifier.clone(),
            _ => None,
        },
        LabelName::DbInstanceClass => record.instance_class.clone(),
        LabelName::StorageType => record.storage_type.clone(),
        LabelName::AvailabilityZone => record.availability_zone.clone(),
        LabelName::VpcId => record.vpc_id.clone(),
        LabelName::Engine => record.engine.clone(),
        LabelName::EngineVersion => record.engine_version.clone(),
        LabelName::IsClusterWriter => is_writer().map(|w| w.to_string()),
        LabelName::RdsInstanceType => match family {
            EngineFamily::Clustered => {
                is_writer().map(|w| if w { "writer" } else { "reader" }.to_string())
            }
            EngineFamily::Replicable => Some(
                match record.replica_source {
                    Some(_) => "slave",
                    None => "master",
                }
                .to_string(),
            ),
            EngineFamily::Other => None,
        },
        LabelName::Tag(key) => inventory
            .lookup_tags(&record.identifier)
            .and_then(|tags| tags.get(key))
            .cloned(),
    }
}
