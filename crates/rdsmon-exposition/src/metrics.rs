//! Enhanced monitoring OS metrics payload.
//!
//! One `RDSOSMetrics` log event decodes into one [`OsMetrics`]. Missing
//! numeric fields decode as zero so every declared series is always emitted.

use serde::Deserialize;

use crate::schema::{FieldDesc, Identity, Record, Schema};

/// Decode one raw log event payload.
pub fn decode_snapshot(payload: &str) -> Result<OsMetrics, serde_json::Error> {
    serde_json::from_str(payload)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OsMetrics {
    pub cpu_utilization: CpuUtilization,
    #[serde(rename = "diskIO")]
    pub disk_io: Vec<DiskIo>,
    pub engine: String,
    pub file_sys: Vec<FileSys>,
    #[serde(rename = "instanceID")]
    pub instance_id: String,
    #[serde(rename = "instanceResourceID")]
    pub instance_resource_id: String,
    pub load_average_minute: LoadAverageMinute,
    pub memory: Memory,
    pub network: Vec<Network>,
    #[serde(rename = "numVCPUs")]
    pub num_vcpus: f64,
    #[serde(rename = "physicalDeviceIO")]
    pub physical_device_io: Vec<PhysicalDeviceIo>,
    pub swap: Swap,
    pub tasks: Tasks,
    pub timestamp: String,
    pub uptime: String,
    pub version: f64,
}

impl Schema for OsMetrics {
    const TYPE_NAME: &'static str = "RDSOSMetrics";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::nested("CpuUtilization", |m| &m.cpu_utilization as &dyn Record),
        FieldDesc::repeated("DiskIO", |m| m.disk_io.iter().map(|d| d as &dyn Record).collect()),
        FieldDesc::textual("Engine", |m| m.engine.as_str()),
        FieldDesc::repeated("FileSys", |m| m.file_sys.iter().map(|f| f as &dyn Record).collect()),
        FieldDesc::textual("InstanceID", |m| m.instance_id.as_str()),
        FieldDesc::textual("InstanceResourceID", |m| m.instance_resource_id.as_str()),
        FieldDesc::nested("LoadAverageMinute", |m| &m.load_average_minute as &dyn Record),
        FieldDesc::nested("Memory", |m| &m.memory as &dyn Record),
        FieldDesc::repeated("Network", |m| m.network.iter().map(|n| n as &dyn Record).collect()),
        FieldDesc::numeric("NumVCPUs", |m| m.num_vcpus),
        FieldDesc::repeated("PhysicalDeviceIO", |m| {
            m.physical_device_io.iter().map(|d| d as &dyn Record).collect()
        }),
        FieldDesc::nested("Swap", |m| &m.swap as &dyn Record),
        FieldDesc::nested("Tasks", |m| &m.tasks as &dyn Record),
        FieldDesc::textual("Timestamp", |m| m.timestamp.as_str()),
        FieldDesc::textual("Uptime", |m| m.uptime.as_str()),
        FieldDesc::numeric("Version", |m| m.version),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CpuUtilization {
    pub guest: f64,
    pub idle: f64,
    pub irq: f64,
    pub nice: f64,
    pub steal: f64,
    pub system: f64,
    pub total: f64,
    pub user: f64,
    pub wait: f64,
}

impl Schema for CpuUtilization {
    const TYPE_NAME: &'static str = "CpuUtilization";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("Guest", |c| c.guest),
        FieldDesc::numeric("Idle", |c| c.idle),
        FieldDesc::numeric("Irq", |c| c.irq),
        FieldDesc::numeric("Nice", |c| c.nice),
        FieldDesc::numeric("Steal", |c| c.steal),
        FieldDesc::numeric("System", |c| c.system),
        FieldDesc::numeric("Total", |c| c.total),
        FieldDesc::numeric("User", |c| c.user),
        FieldDesc::numeric("Wait", |c| c.wait),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiskIo {
    pub avg_queue_len: f64,
    pub avg_req_sz: f64,
    #[serde(rename = "await")]
    pub await_ms: f64,
    pub device: String,
    #[serde(rename = "readIOsPS")]
    pub read_ios_ps: f64,
    pub read_kb: f64,
    #[serde(rename = "readKbPS")]
    pub read_kb_ps: f64,
    #[serde(rename = "rrqmPS")]
    pub rrqm_ps: f64,
    pub tps: f64,
    pub util: f64,
    #[serde(rename = "writeIOsPS")]
    pub write_ios_ps: f64,
    pub write_kb: f64,
    #[serde(rename = "writeKbPS")]
    pub write_kb_ps: f64,
    #[serde(rename = "wrqmPS")]
    pub wrqm_ps: f64,
}

impl Schema for DiskIo {
    const TYPE_NAME: &'static str = "DiskIO";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("AvgQueueLen", |d| d.avg_queue_len),
        FieldDesc::numeric("AvgReqSz", |d| d.avg_req_sz),
        FieldDesc::numeric("Await", |d| d.await_ms),
        FieldDesc::textual("Device", |d| d.device.as_str()),
        FieldDesc::numeric("ReadIOsPS", |d| d.read_ios_ps),
        FieldDesc::numeric("ReadKb", |d| d.read_kb),
        FieldDesc::numeric("ReadKbPS", |d| d.read_kb_ps),
        FieldDesc::numeric("RrqmPS", |d| d.rrqm_ps),
        FieldDesc::numeric("Tps", |d| d.tps),
        FieldDesc::numeric("Util", |d| d.util),
        FieldDesc::numeric("WriteIOsPS", |d| d.write_ios_ps),
        FieldDesc::numeric("WriteKb", |d| d.write_kb),
        FieldDesc::numeric("WriteKbPS", |d| d.write_kb_ps),
        FieldDesc::numeric("WrqmPS", |d| d.wrqm_ps),
    ];
    const IDENTITY: &'static [Identity<Self>] = &[Identity {
        label: "Device",
        value: |d| d.device.as_str(),
    }];
}

/// Per physical device I/O, reported by Aurora instances.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicalDeviceIo {
    pub avg_queue_len: f64,
    pub avg_req_sz: f64,
    #[serde(rename = "await")]
    pub await_ms: f64,
    pub device: String,
    #[serde(rename = "readIOsPS")]
    pub read_ios_ps: f64,
    #[serde(rename = "readKbPS")]
    pub read_kb_ps: f64,
    #[serde(rename = "rrqmPS")]
    pub rrqm_ps: f64,
    pub util: f64,
    #[serde(rename = "writeIOsPS")]
    pub write_ios_ps: f64,
    #[serde(rename = "writeKbPS")]
    pub write_kb_ps: f64,
    #[serde(rename = "wrqmPS")]
    pub wrqm_ps: f64,
}

impl Schema for PhysicalDeviceIo {
    const TYPE_NAME: &'static str = "PhysicalDeviceIO";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("AvgQueueLen", |d| d.avg_queue_len),
        FieldDesc::numeric("AvgReqSz", |d| d.avg_req_sz),
        FieldDesc::numeric("Await", |d| d.await_ms),
        FieldDesc::textual("Device", |d| d.device.as_str()),
        FieldDesc::numeric("ReadIOsPS", |d| d.read_ios_ps),
        FieldDesc::numeric("ReadKbPS", |d| d.read_kb_ps),
        FieldDesc::numeric("RrqmPS", |d| d.rrqm_ps),
        FieldDesc::numeric("Util", |d| d.util),
        FieldDesc::numeric("WriteIOsPS", |d| d.write_ios_ps),
        FieldDesc::numeric("WriteKbPS", |d| d.write_kb_ps),
        FieldDesc::numeric("WrqmPS", |d| d.wrqm_ps),
    ];
    const IDENTITY: &'static [Identity<Self>] = &[Identity {
        label: "Device",
        value: |d| d.device.as_str(),
    }];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileSys {
    pub max_files: f64,
    pub mount_point: String,
    pub name: String,
    pub total: f64,
    pub used: f64,
    pub used_file_percent: f64,
    pub used_files: f64,
    pub used_percent: f64,
}

impl Schema for FileSys {
    const TYPE_NAME: &'static str = "FileSys";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("MaxFiles", |f| f.max_files),
        FieldDesc::textual("MountPoint", |f| f.mount_point.as_str()),
        FieldDesc::textual("Name", |f| f.name.as_str()),
        FieldDesc::numeric("Total", |f| f.total),
        FieldDesc::numeric("Used", |f| f.used),
        FieldDesc::numeric("UsedFilePercent", |f| f.used_file_percent),
        FieldDesc::numeric("UsedFiles", |f| f.used_files),
        FieldDesc::numeric("UsedPercent", |f| f.used_percent),
    ];
    const IDENTITY: &'static [Identity<Self>] = &[
        Identity {
            label: "MountPoint",
            value: |f| f.mount_point.as_str(),
        },
        Identity {
            label: "Name",
            value: |f| f.name.as_str(),
        },
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadAverageMinute {
    pub fifteen: f64,
    pub five: f64,
    pub one: f64,
}

impl Schema for LoadAverageMinute {
    const TYPE_NAME: &'static str = "LoadAverageMinute";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("Fifteen", |l| l.fifteen),
        FieldDesc::numeric("Five", |l| l.five),
        FieldDesc::numeric("One", |l| l.one),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Memory {
    pub active: f64,
    pub buffers: f64,
    pub cached: f64,
    pub dirty: f64,
    pub free: f64,
    pub huge_pages_free: f64,
    pub huge_pages_rsvd: f64,
    pub huge_pages_size: f64,
    pub huge_pages_surp: f64,
    pub huge_pages_total: f64,
    pub inactive: f64,
    pub mapped: f64,
    pub page_tables: f64,
    pub slab: f64,
    pub total: f64,
    pub writeback: f64,
}

impl Schema for Memory {
    const TYPE_NAME: &'static str = "Memory";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("Active", |m| m.active),
        FieldDesc::numeric("Buffers", |m| m.buffers),
        FieldDesc::numeric("Cached", |m| m.cached),
        FieldDesc::numeric("Dirty", |m| m.dirty),
        FieldDesc::numeric("Free", |m| m.free),
        FieldDesc::numeric("HugePagesFree", |m| m.huge_pages_free),
        FieldDesc::numeric("HugePagesRsvd", |m| m.huge_pages_rsvd),
        FieldDesc::numeric("HugePagesSize", |m| m.huge_pages_size),
        FieldDesc::numeric("HugePagesSurp", |m| m.huge_pages_surp),
        FieldDesc::numeric("HugePagesTotal", |m| m.huge_pages_total),
        FieldDesc::numeric("Inactive", |m| m.inactive),
        FieldDesc::numeric("Mapped", |m| m.mapped),
        FieldDesc::numeric("PageTables", |m| m.page_tables),
        FieldDesc::numeric("Slab", |m| m.slab),
        FieldDesc::numeric("Total", |m| m.total),
        FieldDesc::numeric("Writeback", |m| m.writeback),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Network {
    pub interface: String,
    pub rx: f64,
    pub tx: f64,
}

impl Schema for Network {
    const TYPE_NAME: &'static str = "Network";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::textual("Interface", |n| n.interface.as_str()),
        FieldDesc::numeric("Rx", |n| n.rx),
        FieldDesc::numeric("Tx", |n| n.tx),
    ];
    const IDENTITY: &'static [Identity<Self>] = &[Identity {
        label: "Interface",
        value: |n| n.interface.as_str(),
    }];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Swap {
    pub cached: f64,
    pub free: f64,
    #[serde(rename = "in")]
    pub swap_in: f64,
    #[serde(rename = "out")]
    pub swap_out: f64,
    pub total: f64,
}

impl Schema for Swap {
    const TYPE_NAME: &'static str = "Swap";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("Cached", |s| s.cached),
        FieldDesc::numeric("Free", |s| s.free),
        FieldDesc::numeric("In", |s| s.swap_in),
        FieldDesc::numeric("Out", |s| s.swap_out),
        FieldDesc::numeric("Total", |s| s.total),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tasks {
    pub blocked: f64,
    pub running: f64,
    pub sleeping: f64,
    pub stopped: f64,
    pub total: f64,
    pub zombie: f64,
}

impl Schema for Tasks {
    const TYPE_NAME: &'static str = "Tasks";
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc::numeric("Blocked", |t| t.blocked),
        FieldDesc::numeric("Running", |t| t.running),
        FieldDesc::numeric("Sleeping", |t| t.sleeping),
        FieldDesc::numeric("Stopped", |t| t.stopped),
        FieldDesc::numeric("Total", |t| t.total),
        FieldDesc::numeric("Zombie", |t| t.zombie),
    ];
}
