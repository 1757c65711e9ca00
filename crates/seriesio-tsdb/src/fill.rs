//! Backfill merge between two same-schema database files
//!
//! `fill` copies samples from a source file into a destination file,
//! writing only into destination slots that are empty for the sample's
//! interval. Destination samples are never overwritten, so data the
//! destination gathered after the source copy was taken survives the
//! merge.
//!
//! The merge is NOT atomic: a failure mid-way leaves the destination
//! with some source points already applied. Callers own that risk.

use crate::format::{Database, Point};
use seriesio_common::{Error, Result};
use std::path::Path;

/// Merge samples from `source` into the empty slots of `destination`
///
/// Both files must share the same archive layout (count, resolution,
/// and size per archive). The source file is only read.
pub fn fill(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<()> {
    let mut src = Database::open(source)?;
    let mut dst = Database::open(destination)?;

    if src.archives() != dst.archives() {
        return Err(Error::format(
            "source and destination archive layouts differ",
        ));
    }

    for index in 0..src.archives().len() {
        fill_archive(&mut src, &mut dst, index)?;
    }
    dst.sync()
}

fn fill_archive(src: &mut Database, dst: &mut Database, index: usize) -> Result<()> {
    let info = src.archives()[index];
    let src_points = src.read_archive(index)?;
    let mut dst_points = dst.read_archive(index)?;

    // Ring-buffer base: the timestamp of slot 0. Zero means the archive
    // has never been written and the first point establishes the base.
    let mut base = info.interval(dst_points[0].timestamp);

    for point in src_points {
        if point.timestamp == 0 {
            continue;
        }
        let interval = info.interval(point.timestamp);

        let slot = if base == 0 {
            base = interval;
            0
        } else {
            slot_for(interval, base, info.seconds_per_point, info.points)
        };

        // Occupied for this interval means the destination already has a
        // sample there; its data wins.
        if info.interval(dst_points[slot as usize].timestamp) == interval {
            continue;
        }

        let aligned = Point {
            timestamp: interval,
            value: point.value,
        };
        dst.write_point(index, slot, aligned)?;
        dst_points[slot as usize] = aligned;
    }
    Ok(())
}

fn slot_for(interval: u32, base: u32, seconds_per_point: u32, points: u32) -> u32 {
    let distance = (i64::from(interval) - i64::from(base)) / i64::from(seconds_per_point);
    distance.rem_euclid(i64::from(points)) as u32
}
