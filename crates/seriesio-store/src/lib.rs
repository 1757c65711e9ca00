//! SeriesIO Store - Local metric file store
//!
//! This crate implements the node-local store layer:
//! - Metric name to filesystem path mapping
//! - In-memory metrics inventory cache (background-built, atomically
//!   published snapshots)
//! - Regex and explicit-list inventory filters
//! - Single-file stat/read/delete operations
//! - The heal/backfill pipeline (staged upload, merge-or-create)

pub mod filter;
pub mod fsops;
pub mod heal;
pub mod inventory;
pub mod pathmap;

// Re-exports
pub use filter::{decode_name_list, filter_list, filter_regex};
pub use fsops::{delete_metric, read_metric, stat_metric};
pub use heal::{validate_upload, HealPipeline, SeriesMerge};
pub use inventory::InventoryCache;
pub use pathmap::PathMapper;
