//! Exposition lines.
//!
//! One [`Series`] renders as
//! `name{k1="v1",k2="v2"} 0.000000 1486977657000`: labels sorted by key,
//! value with six decimals, then the event timestamp in epoch milliseconds.

use std::collections::BTreeMap;
use std::fmt;

/// Ordered set of labels with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}=\"")?;
            write_escaped(f, value)?;
            f.write_str("\"")?;
        }
        Ok(())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

/// A single time-series point.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: LabelSet,
    pub value: f64,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{{}}} {:.6} {}",
            self.name, self.labels, self.value, self.timestamp_ms
        )
    }
}

/// Render series as newline-joined exposition lines.
pub fn render(series: &[Series]) -> String {
    series
        .iter()
        .map(Series::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_render_sorted() {
        let labels: LabelSet = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(labels.to_string(), "a=\"1\",b=\"2\"");
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut labels = LabelSet::new();
        labels.insert("Device", "sda");
        labels.insert("Device", "sdb");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("Device"), Some("sdb"));
    }

    #[test]
    fn label_values_are_escaped() {
        let labels: LabelSet = [("path", "C:\\tmp \"x\"\n")].into_iter().collect();
        assert_eq!(labels.to_string(), "path=\"C:\\\\tmp \\\"x\\\"\\n\"");
    }

    #[test]
    fn series_line_format() {
        let series = Series {
            name: "rds_enhanced_monitoring_CpuUtilization_Guest".to_string(),
            labels: [("DBInstanceIdentifier", "AAA")].into_iter().collect(),
            value: 0.0,
            timestamp_ms: 1486977657000,
        };
        assert_eq!(
            series.to_string(),
            "rds_enhanced_monitoring_CpuUtilization_Guest{DBInstanceIdentifier=\"AAA\"} 0.000000 1486977657000"
        );
    }

    #[test]
    fn empty_labels_render_braces() {
        let series = Series {
            name: "m".to_string(),
            labels: LabelSet::new(),
            value: 1.5,
            timestamp_ms: 7,
        };
        assert_eq!(series.to_string(), "m{} 1.500000 7");
    }

    #[test]
    fn render_joins_without_trailing_newline() {
        let make = |v: f64| Series {
            name: "m".to_string(),
            labels: LabelSet::new(),
            value: v,
            timestamp_ms: 1,
        };
        assert_eq!(render(&[make(1.0), make(2.0)]), "m{} 1.000000 1\nm{} 2.000000 1");
        assert_eq!(render(&[]), "");
    }
}
