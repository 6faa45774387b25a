//! rdsmon-exposition - turns enhanced monitoring snapshots into series lines.
//!
//! # Architecture
//!
//! ```text
//! OsMetrics (serde, decoded from one log event)
//!   └── Schema::FIELDS      ← declared field table per record type
//!         └── Record::visit ← typed walk over the table
//!               └── flatten() → Vec<Series>
//!                     └── render() → text lines for the scrape endpoint
//! ```
//!
//! Field order in each table fixes the output order, so flattening the same
//! snapshot with the same labels always yields the same lines.

pub mod flatten;
pub mod metrics;
pub mod schema;
pub mod series;

pub use flatten::{count_numeric_leaves, flatten};
pub use metrics::{OsMetrics, decode_snapshot};
pub use schema::{FieldDesc, FieldKind, Identity, Record, Schema, Visitor};
pub use series::{LabelSet, Series, render};
