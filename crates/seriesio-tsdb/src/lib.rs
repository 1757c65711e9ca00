//! SeriesIO TSDB - Time-series database files
//!
//! This crate implements the fixed-format database file that stores one
//! metric's history, and the backfill merge over two same-schema files:
//! - Header and archive descriptor encode/parse
//! - Ring-buffer point storage with interval-aligned timestamps
//! - `fill`: copy samples from a source file into the empty slots of a
//!   destination file without discarding the destination's own samples

pub mod fill;
pub mod format;

// Re-exports
pub use fill::fill;
pub use format::{
    Aggregation, ArchiveInfo, ArchiveSpec, Database, Header, Point, ARCHIVE_INFO_SIZE,
    HEADER_SIZE, POINT_SIZE,
};
