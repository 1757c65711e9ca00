//! Heal/backfill pipeline
//!
//! Staged ingestion of an uploaded database file:
//! validate, stage to a uniquely-named temp file, then either merge
//! into the existing destination or install the upload as a new file.
//! The staging file is removed on every exit path.
//!
//! Concurrent heals of different metrics never share state - each gets
//! its own staging file. Concurrent heals of the SAME metric race at
//! the filesystem level (no per-path locking); the last write or merge
//! observed wins.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use seriesio_common::{Error, Result, MIN_DATABASE_SIZE};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// The external merge capability
///
/// Given two database files of compatible schema, incorporates source
/// samples into the destination. Injected so pipeline logic is testable
/// against a fake; the production implementation is wired at the
/// composition root. Not assumed to roll the destination back on
/// partial failure.
pub trait SeriesMerge: Send + Sync {
    /// Merge samples from `source` into `destination`
    fn merge(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// Check an upload's content type and declared length
///
/// Both checks run before any filesystem I/O. The declared length must
/// be strictly larger than the fixed database header footprint.
pub fn validate_upload(content_type: Option<&str>, content_length: Option<&str>) -> Result<u64> {
    if content_type != Some("application/octet-stream") {
        return Err(Error::invalid_request(
            "Content-Type must be application/octet-stream",
        ));
    }
    let length: u64 = content_length
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| Error::invalid_request("Content-Length must be an integer"))?;
    if length <= MIN_DATABASE_SIZE {
        return Err(Error::invalid_request(format!(
            "database upload of {length} bytes is too small"
        )));
    }
    Ok(length)
}

/// Staged-write ingestion of uploaded database files
pub struct HealPipeline {
    staging_dir: PathBuf,
    merger: Arc<dyn SeriesMerge>,
}

impl HealPipeline {
    /// Create a pipeline staging into the given directory
    ///
    /// The staging directory must exist and be writable before use.
    #[must_use]
    pub fn new(staging_dir: impl Into<PathBuf>, merger: Arc<dyn SeriesMerge>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            merger,
        }
    }

    /// Ingest an uploaded database file for the metric at `destination`
    ///
    /// The body stream is written to a staging file first; the
    /// destination is only touched once the full upload is on disk.
    /// If the destination exists the staged file is merged into it,
    /// otherwise the staged bytes are installed verbatim. The staging
    /// file is removed on every exit path, success or failure.
    pub async fn ingest<S, E>(&self, destination: &Path, body: S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let destination_exists = self.resolve_destination(destination)?;

        // Staging file removal on drop covers every path out of here.
        let staging = self.stage_body(body).await?;

        if destination_exists {
            debug!(staging = %staging.path().display(), destination = %destination.display(),
                "merging staged upload into existing database");
            self.merger.merge(staging.path(), destination)?;
        } else {
            debug!(destination = %destination.display(), "installing staged upload as new database");
            copy_verbatim(staging.path(), destination)?;
        }
        Ok(())
    }

    /// Stat the destination; create its parent directory when absent
    fn resolve_destination(&self, destination: &Path) -> Result<bool> {
        match std::fs::metadata(destination) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stream the request body into a uniquely-named staging file
    async fn stage_body<S, E>(&self, mut body: S) -> Result<NamedTempFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let mut staging = NamedTempFile::with_prefix_in("heal-", &self.staging_dir)?;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!("upload body read failed: {e}");
                Error::internal(format!("upload body read failed: {e}"))
            })?;
            staging.write_all(&chunk)?;
        }
        staging.as_file().sync_all()?;
        Ok(staging)
    }
}

/// Copy the staged file to the destination byte-for-byte
fn copy_verbatim(staging: &Path, destination: &Path) -> Result<()> {
    let mut src = std::fs::File::open(staging)?;
    let mut dst = std::fs::File::create(destination)?;
    std::io::copy(&mut src, &mut dst)?;
    dst.sync_all()?;
    Ok(())
}
