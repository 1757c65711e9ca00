//! SeriesIO Node - Per-node metric store agent
//!
//! Library surface for the node daemon: the HTTP API router and the
//! production merge capability wired into the heal pipeline.

pub mod api;

use seriesio_common::{Error, Result};
use seriesio_store::SeriesMerge;
use std::path::Path;

/// Merge capability backed by the database file format
///
/// Backfills samples from the staged upload into the destination
/// without discarding the destination's own samples.
pub struct TsdbMerge;

impl SeriesMerge for TsdbMerge {
    fn merge(&self, source: &Path, destination: &Path) -> Result<()> {
        seriesio_tsdb::fill(source, destination).map_err(|e| Error::Merge(e.to_string()))
    }
}
