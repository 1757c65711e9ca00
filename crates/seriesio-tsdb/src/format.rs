//! Database file layout
//!
//! File Layout:
//! ```text
//! +--------------------+  offset 0
//! |      Header        |  16 bytes - aggregation, retention, xff, count
//! +--------------------+
//! | Archive descriptor |  12 bytes per archive - offset, resolution, points
//! |       ...          |
//! +--------------------+
//! |    Archive 0       |  ring buffer of 12-byte points
//! +--------------------+
//! |    Archive 1       |  coarser resolution
//! |       ...          |
//! +--------------------+
//! ```
//!
//! All integers are big-endian. A point is a `(timestamp: u32,
//! value: f64)` pair; timestamp 0 marks an empty slot. Each archive is a
//! ring buffer keyed off its base point (slot 0): the slot for an
//! interval-aligned timestamp `t` is `((t - base) / resolution) mod
//! points`.

use bytes::{Buf, BufMut, BytesMut};
use seriesio_common::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Archive descriptor size in bytes
pub const ARCHIVE_INFO_SIZE: usize = 12;

/// Stored point size in bytes
pub const POINT_SIZE: usize = 12;

/// Aggregation method used when downsampling into coarser archives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Aggregation {
    Average = 1,
    Sum = 2,
    Last = 3,
    Max = 4,
    Min = 5,
}

impl Aggregation {
    fn from_u32(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::Average),
            2 => Ok(Self::Sum),
            3 => Ok(Self::Last),
            4 => Ok(Self::Max),
            5 => Ok(Self::Min),
            other => Err(Error::format(format!(
                "unknown aggregation method: {other}"
            ))),
        }
    }
}

/// Fixed file header
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Header {
    /// Aggregation method for downsampling
    pub aggregation: Aggregation,
    /// Maximum retention across all archives, in seconds
    pub max_retention: u32,
    /// Fraction of known points required to aggregate (0.0 to 1.0)
    pub x_files_factor: f32,
    /// Number of archives in the file
    pub archive_count: u32,
}

impl Header {
    /// Serialize the header to its on-disk form
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_u32(self.aggregation as u32);
        buf.put_u32(self.max_retention);
        buf.put_f32(self.x_files_factor);
        buf.put_u32(self.archive_count);

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Parse a header from its on-disk form
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::format("header truncated"));
        }

        let mut buf = data;
        let aggregation = Aggregation::from_u32(buf.get_u32())?;
        let max_retention = buf.get_u32();
        let x_files_factor = buf.get_f32();
        let archive_count = buf.get_u32();

        let header = Self {
            aggregation,
            max_retention,
            x_files_factor,
            archive_count,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.archive_count == 0 {
            return Err(Error::format("file declares zero archives"));
        }
        if !(0.0..=1.0).contains(&self.x_files_factor) {
            return Err(Error::format(format!(
                "x-files-factor {} out of range",
                self.x_files_factor
            )));
        }
        Ok(())
    }
}

/// Descriptor for one archive within the file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Byte offset of the archive's point region
    pub offset: u32,
    /// Seconds covered by one point
    pub seconds_per_point: u32,
    /// Number of points in the ring buffer
    pub points: u32,
}

impl ArchiveInfo {
    /// Total seconds of history this archive covers
    #[must_use]
    pub const fn retention(&self) -> u32 {
        self.seconds_per_point * self.points
    }

    /// Size of the archive's point region in bytes
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.points as u64 * POINT_SIZE as u64
    }

    /// Align a timestamp down to this archive's interval
    #[must_use]
    pub const fn interval(&self, timestamp: u32) -> u32 {
        timestamp - timestamp % self.seconds_per_point
    }

    #[must_use]
    fn to_bytes(self) -> [u8; ARCHIVE_INFO_SIZE] {
        let mut buf = BytesMut::with_capacity(ARCHIVE_INFO_SIZE);
        buf.put_u32(self.offset);
        buf.put_u32(self.seconds_per_point);
        buf.put_u32(self.points);

        let mut out = [0u8; ARCHIVE_INFO_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < ARCHIVE_INFO_SIZE {
            return Err(Error::format("archive descriptor truncated"));
        }

        let mut buf = data;
        let info = Self {
            offset: buf.get_u32(),
            seconds_per_point: buf.get_u32(),
            points: buf.get_u32(),
        };
        if info.seconds_per_point == 0 || info.points == 0 {
            return Err(Error::format("archive descriptor has zero resolution or size"));
        }
        Ok(info)
    }
}

/// One stored sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Interval-aligned unix timestamp; 0 marks an empty slot
    pub timestamp: u32,
    /// Sample value
    pub value: f64,
}

impl Point {
    /// An empty slot
    pub const EMPTY: Self = Self {
        timestamp: 0,
        value: 0.0,
    };

    #[must_use]
    fn to_bytes(self) -> [u8; POINT_SIZE] {
        let mut buf = BytesMut::with_capacity(POINT_SIZE);
        buf.put_u32(self.timestamp);
        buf.put_f64(self.value);

        let mut out = [0u8; POINT_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    fn from_bytes(data: &[u8]) -> Self {
        let mut buf = data;
        Self {
            timestamp: buf.get_u32(),
            value: buf.get_f64(),
        }
    }
}

/// Requested shape of one archive when creating a file
#[derive(Clone, Copy, Debug)]
pub struct ArchiveSpec {
    /// Seconds covered by one point
    pub seconds_per_point: u32,
    /// Number of points in the ring buffer
    pub points: u32,
}

/// An open database file
pub struct Database {
    file: File,
    header: Header,
    archives: Vec<ArchiveInfo>,
}

impl Database {
    /// Create a new database file with the given archive layout
    ///
    /// Archives must be ordered finest-resolution first with strictly
    /// increasing `seconds_per_point`. The point regions are
    /// zero-filled, so every slot starts empty.
    pub fn create(
        path: impl AsRef<Path>,
        specs: &[ArchiveSpec],
        x_files_factor: f32,
        aggregation: Aggregation,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::format("at least one archive is required"));
        }
        for pair in specs.windows(2) {
            if pair[1].seconds_per_point <= pair[0].seconds_per_point {
                return Err(Error::format(
                    "archives must have strictly increasing seconds-per-point",
                ));
            }
        }
        for spec in specs {
            if spec.seconds_per_point == 0 || spec.points == 0 {
                return Err(Error::format("archive resolution and size must be nonzero"));
            }
        }

        let mut offset = (HEADER_SIZE + specs.len() * ARCHIVE_INFO_SIZE) as u32;
        let mut archives = Vec::with_capacity(specs.len());
        for spec in specs {
            let info = ArchiveInfo {
                offset,
                seconds_per_point: spec.seconds_per_point,
                points: spec.points,
            };
            offset = offset
                .checked_add(
                    u32::try_from(info.size_bytes())
                        .map_err(|_| Error::format("archive too large"))?,
                )
                .ok_or_else(|| Error::format("archive layout overflows file offsets"))?;
            archives.push(info);
        }

        let max_retention = archives.iter().map(ArchiveInfo::retention).max().unwrap_or(0);
        let header = Header {
            aggregation,
            max_retention,
            x_files_factor,
            archive_count: archives.len() as u32,
        };
        header.validate()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        file.write_all(&header.to_bytes())?;
        for info in &archives {
            file.write_all(&info.to_bytes())?;
        }
        // Zero-fill the point regions so every slot reads as empty
        let data_len: u64 = archives.iter().map(ArchiveInfo::size_bytes).sum();
        file.set_len((HEADER_SIZE + archives.len() * ARCHIVE_INFO_SIZE) as u64 + data_len)?;
        file.sync_all()?;

        Ok(Self {
            file,
            header,
            archives,
        })
    }

    /// Open an existing database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)?;
        let header = Header::from_bytes(&header_buf)?;

        let mut archives = Vec::with_capacity(header.archive_count as usize);
        for _ in 0..header.archive_count {
            let mut info_buf = [0u8; ARCHIVE_INFO_SIZE];
            file.read_exact(&mut info_buf)?;
            archives.push(ArchiveInfo::from_bytes(&info_buf)?);
        }

        let expected_end = archives
            .iter()
            .map(|a| u64::from(a.offset) + a.size_bytes())
            .max()
            .unwrap_or(0);
        if file.metadata()?.len() < expected_end {
            return Err(Error::format("file shorter than its archive layout"));
        }

        Ok(Self {
            file,
            header,
            archives,
        })
    }

    /// Get the file header
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Get the archive descriptors, finest resolution first
    #[must_use]
    pub fn archives(&self) -> &[ArchiveInfo] {
        &self.archives
    }

    /// Read every point of one archive in ring-buffer order
    pub fn read_archive(&mut self, index: usize) -> Result<Vec<Point>> {
        let info = self.archive(index)?;
        let mut buf = vec![0u8; info.size_bytes() as usize];
        self.file.seek(SeekFrom::Start(u64::from(info.offset)))?;
        self.file.read_exact(&mut buf)?;

        Ok(buf
            .chunks_exact(POINT_SIZE)
            .map(Point::from_bytes)
            .collect())
    }

    /// Write one point into the given slot of an archive
    pub fn write_point(&mut self, index: usize, slot: u32, point: Point) -> Result<()> {
        let info = self.archive(index)?;
        if slot >= info.points {
            return Err(Error::format(format!(
                "slot {} out of range for archive of {} points",
                slot, info.points
            )));
        }

        let offset = u64::from(info.offset) + u64::from(slot) * POINT_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&point.to_bytes())?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn archive(&self, index: usize) -> Result<ArchiveInfo> {
        self.archives
            .get(index)
            .copied()
            .ok_or_else(|| Error::format(format!("archive index {index} out of range")))
    }
}
