//! Flattening nested records into series.
//!
//! Numeric leaves become one series each, named by the path of type and
//! field names leading to them. Textual leaves produce nothing. Elements of
//! repeated collections add their identity labels to a copy of the current
//! label set before descending.

use crate::schema::{Record, Visitor};
use crate::series::{LabelSet, Series};

/// Flatten `record` into series.
///
/// `prefix` starts every series name (usually the exporter namespace);
/// `labels` is attached to every series; `timestamp_ms` stamps all of them.
pub fn flatten(record: &dyn Record, prefix: &str, labels: &LabelSet, timestamp_ms: i64) -> Vec<Series> {
    let mut out = Vec::new();
    let mut walker = Flattener {
        prefix: prefix.to_string(),
        labels: labels.clone(),
        timestamp_ms,
        out: &mut out,
    };
    record.visit(&mut walker);
    out
}

/// Number of numeric leaves reachable from `record`.
pub fn count_numeric_leaves(record: &dyn Record) -> usize {
    let mut counter = LeafCounter(0);
    record.visit(&mut counter);
    counter.0
}

struct Flattener<'a> {
    prefix: String,
    labels: LabelSet,
    timestamp_ms: i64,
    out: &'a mut Vec<Series>,
}

impl Flattener<'_> {
    fn descend(&mut self, record: &dyn Record, labels: LabelSet) {
        let mut child = Flattener {
            prefix: format!("{}{}_", self.prefix, record.type_name()),
            labels,
            timestamp_ms: self.timestamp_ms,
            out: &mut *self.out,
        };
        record.visit(&mut child);
    }
}

impl Visitor for Flattener<'_> {
    fn numeric(&mut self, name: &'static str, value: f64) {
        self.out.push(Series {
            name: format!("{}{}", self.prefix, name),
            labels: self.labels.clone(),
            value,
            timestamp_ms: self.timestamp_ms,
        });
    }

    fn nested(&mut self, record: &dyn Record) {
        let labels = self.labels.clone();
        self.descend(record, labels);
    }

    fn repeated(&mut self, items: Vec<&dyn Record>) {
        for item in items {
            let mut labels = self.labels.clone();
            for (label, value) in item.identity() {
                labels.insert(label, value);
            }
            self.descend(item, labels);
        }
    }
}

struct LeafCounter(usize);

impl Visitor for LeafCounter {
    fn numeric(&mut self, _name: &'static str, _value: f64) {
        self.0 += 1;
    }

    fn nested(&mut self, record: &dyn Record) {
        record.visit(self);
    }

    fn repeated(&mut self, items: Vec<&dyn Record>) {
        for item in items {
            item.visit(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::*;

    const PREFIX: &str = "rds_enhanced_monitoring_";

    fn base_labels() -> LabelSet {
        [("DBInstanceIdentifier", "AAA")].into_iter().collect()
    }

    fn sample() -> OsMetrics {
        decode_snapshot(
            r#"{
                "engine": "MYSQL",
                "instanceID": "AAA",
                "numVCPUs": 2,
                "version": 1,
                "cpuUtilization": {"guest": 0, "idle": 98.13, "total": 1.87},
                "network": [{"interface": "eth0", "rx": 1323.67, "tx": 5342}],
                "diskIO": [
                    {"device": "rdsdev", "tps": 0.53},
                    {"device": "filesystem", "tps": 1.5}
                ],
                "fileSys": [{"name": "rdsfilesys", "mountPoint": "/rdsdbdata", "usedPercent": 23.17}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn line_count_equals_numeric_leaves() {
        let m = sample();
        let series = flatten(&m, PREFIX, &base_labels(), 1000);
        assert_eq!(series.len(), count_numeric_leaves(&m));
        // 2 top-level + 9 cpu + 3 load + 16 memory + 5 swap + 6 tasks
        // + 2 network + 2 × 13 diskIO + 6 fileSys.
        assert_eq!(series.len(), 2 + 9 + 3 + 16 + 5 + 6 + 2 + 26 + 6);
    }

    #[test]
    fn nested_record_names_use_type_prefix() {
        let series = flatten(&sample(), PREFIX, &base_labels(), 1486977657000);
        let guest = series
            .iter()
            .find(|s| s.name == "rds_enhanced_monitoring_CpuUtilization_Guest")
            .unwrap();
        assert_eq!(guest.value, 0.0);
        assert_eq!(guest.labels, base_labels());
        assert_eq!(guest.timestamp_ms, 1486977657000);

        assert!(series.iter().any(|s| s.name == "rds_enhanced_monitoring_NumVCPUs" && s.value == 2.0));
        assert!(series.iter().any(|s| s.name == "rds_enhanced_monitoring_Swap_In"));
    }

    #[test]
    fn textual_leaves_produce_no_series() {
        let series = flatten(&sample(), PREFIX, &base_labels(), 0);
        for textual in ["Engine", "InstanceID", "Timestamp", "Uptime", "DiskIO_Device", "Network_Interface"] {
            let name = format!("{PREFIX}{textual}");
            assert!(series.iter().all(|s| s.name != name), "{name} should not be emitted");
        }
    }

    #[test]
    fn repeated_elements_carry_identity_labels() {
        let series = flatten(&sample(), PREFIX, &base_labels(), 0);

        let tps: Vec<&Series> = series
            .iter()
            .filter(|s| s.name == "rds_enhanced_monitoring_DiskIO_Tps")
            .collect();
        assert_eq!(tps.len(), 2);
        assert_eq!(tps[0].labels.get("Device"), Some("rdsdev"));
        assert_eq!(tps[1].labels.get("Device"), Some("filesystem"));
        assert_eq!(tps[0].labels.get("DBInstanceIdentifier"), Some("AAA"));

        let used = series
            .iter()
            .find(|s| s.name == "rds_enhanced_monitoring_FileSys_UsedPercent")
            .unwrap();
        assert_eq!(used.labels.get("MountPoint"), Some("/rdsdbdata"));
        assert_eq!(used.labels.get("Name"), Some("rdsfilesys"));

        let rx = series
            .iter()
            .find(|s| s.name == "rds_enhanced_monitoring_Network_Rx")
            .unwrap();
        assert_eq!(rx.labels.get("Interface"), Some("eth0"));
        assert_eq!(rx.value, 1323.67);
    }

    #[test]
    fn identity_labels_do_not_leak_to_siblings() {
        let series = flatten(&sample(), PREFIX, &base_labels(), 0);
        let memory = series
            .iter()
            .find(|s| s.name == "rds_enhanced_monitoring_Memory_Total")
            .unwrap();
        assert!(!memory.labels.contains_key("Device"));
        assert_eq!(memory.labels.len(), 1);
    }

    #[test]
    fn empty_collections_emit_nothing() {
        let series = flatten(&OsMetrics::default(), PREFIX, &LabelSet::new(), 0);
        assert!(series.iter().all(|s| !s.name.contains("DiskIO")));
        assert!(series.iter().all(|s| !s.name.contains("PhysicalDeviceIO")));
        assert_eq!(series.len(), 2 + 9 + 3 + 16 + 5 + 6);
    }

    #[test]
    fn output_order_is_deterministic() {
        let m = sample();
        let first = flatten(&m, PREFIX, &base_labels(), 5);
        let second = flatten(&m, PREFIX, &base_labels(), 5);
        assert_eq!(first, second);
        assert_eq!(first[0].name, "rds_enhanced_monitoring_CpuUtilization_Guest");
        assert_eq!(first.last().unwrap().name, "rds_enhanced_monitoring_Version");
    }
}
