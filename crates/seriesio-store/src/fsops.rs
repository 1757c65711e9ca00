//! Single-file stat, read, and delete operations
//!
//! Thin typed wrappers over one filesystem call each. The only mapping
//! performed is errno classification: a missing file becomes the typed
//! `MetricNotFound`, everything else stays an I/O error.

use seriesio_common::{Error, MetricStat, Result};
use std::io::ErrorKind;
use std::path::Path;

/// Stat a metric's database file
pub fn stat_metric(metric: &str, path: &Path) -> Result<MetricStat> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(MetricStat::from_metadata(metric, &meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found(metric)),
        Err(e) => Err(e.into()),
    }
}

/// Read a metric's database file in full
pub fn read_metric(metric: &str, path: &Path) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found(metric)),
        Err(e) => Err(e.into()),
    }
}

/// Remove a metric's database file
///
/// A missing file succeeds silently unless `fatal_if_missing` is set,
/// in which case it is reported as not found.
pub fn delete_metric(metric: &str, path: &Path, fatal_if_missing: bool) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if fatal_if_missing {
                Err(Error::not_found(metric))
            } else {
                Ok(())
            }
        }
        Err(e) => Err(e.into()),
    }
}
