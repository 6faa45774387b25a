//! rdsmon-collector - turns a scrape into series.
//!
//! # Architecture
//!
//! ```text
//! ScrapeRequest { caller, resource_id?, labels }
//!   └── IncrementalCollector::collect()
//!         ├── StreamSelector        explicit target, or every stream active in the window
//!         ├── InventoryCache        snapshot taken once per scrape; unknown streams skipped
//!         ├── per-stream task       semaphore-bounded, paced per slot
//!         │     ├── LogProvider::fetch_events(after = high-water mark)
//!         │     └── decode_snapshot + flatten   missing stream or group is an empty batch
//!         ├── join                  first error fails the scrape unless the skip policy is set
//!         └── HighWaterMarks::advance(caller, stream) for each delivered batch
//! ```

pub mod collector;
pub mod labels;
pub mod selector;
pub mod watermark;

pub use collector::{CollectError, CollectorSettings, IncrementalCollector, ScrapeRequest};
pub use labels::{LabelName, LabelRequest};
pub use selector::StreamSelector;
pub use watermark::HighWaterMarks;
