//! rdsmon-inventory - cached database inventory.
//!
//! # Architecture
//!
//! ```text
//! Refresher (background loop, every refresh_interval)
//!   └── InventoryCache::refresh()
//!         ├── InventoryProvider calls   ← no lock held
//!         ├── merge into a copy of the current Inventory
//!         └── ArcSwap::store            ← readers see old or new, never partial
//!
//! Scrape handlers
//!   └── InventoryCache::snapshot() / lookup*()   ← lock-free reads
//! ```
//!
//! A failed refresh keeps the previous snapshot. Entries that disappear from
//! the provider are kept; refreshes only add and overwrite.

pub mod cache;
pub mod refresher;

pub use cache::{Inventory, InventoryCache, InventoryError, RefreshStats};
pub use refresher::Refresher;
