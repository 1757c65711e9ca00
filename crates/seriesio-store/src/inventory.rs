//! In-memory metrics inventory cache
//!
//! Listing queries are answered from a background-built snapshot of
//! every metric name under the store root, so a request never pays for
//! a full filesystem walk. A coarse state guard serializes rebuilds (at
//! most one walk in flight) and snapshot publication is a single
//! reference swap, so concurrent readers either see the last complete
//! snapshot or a "not ready" signal - never a partially built list.

use crate::pathmap::PathMapper;
use parking_lot::{Mutex, RwLock};
use seriesio_common::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Cache lifecycle states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InventoryState {
    /// Never built; the first read triggers a build
    Empty,
    /// A rebuild walk is in flight
    Building,
    /// A snapshot is published
    Ready,
}

/// Rebuild statistics for monitoring
#[derive(Debug, Default)]
pub struct InventoryStats {
    /// Completed rebuild walks
    pub rebuilds: AtomicU64,
    /// Aborted rebuild walks
    pub failures: AtomicU64,
}

/// Background-built inventory of metric names
///
/// Constructed once at the composition root and shared by handle;
/// every operation is non-blocking for the caller.
pub struct InventoryCache {
    mapper: PathMapper,
    state: Mutex<InventoryState>,
    snapshot: RwLock<Option<Arc<Vec<String>>>>,
    stats: InventoryStats,
}

impl InventoryCache {
    /// Create an empty cache over the given store root
    #[must_use]
    pub fn new(mapper: PathMapper) -> Self {
        Self {
            mapper,
            state: Mutex::new(InventoryState::Empty),
            snapshot: RwLock::new(None),
            stats: InventoryStats::default(),
        }
    }

    /// Get the current snapshot without blocking
    ///
    /// Returns `(None, false)` while a rebuild is in flight (callers
    /// must not read that as an empty inventory). On a never-built
    /// cache this triggers the first rebuild and reports not ready.
    #[must_use]
    pub fn get_snapshot(self: &Arc<Self>) -> (Option<Arc<Vec<String>>>, bool) {
        {
            let state = self.state.lock();
            match *state {
                InventoryState::Building => return (None, false),
                InventoryState::Ready => return (self.snapshot.read().clone(), true),
                InventoryState::Empty => {}
            }
        }
        // Never built: kick off the first walk and report not ready
        self.trigger_rebuild();
        (None, false)
    }

    /// Whether a forced rebuild may be requested right now
    #[must_use]
    pub fn is_available(&self) -> bool {
        *self.state.lock() != InventoryState::Building
    }

    /// Start an asynchronous rebuild of the inventory
    ///
    /// Returns false without doing anything if a rebuild is already in
    /// flight. The walk runs on a blocking thread; its outcome is never
    /// surfaced to the caller, only logged.
    pub fn trigger_rebuild(self: &Arc<Self>) -> bool {
        if !self.try_begin() {
            debug!("inventory rebuild already in flight");
            return false;
        }
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || cache.rebuild());
        true
    }

    /// Rebuild statistics
    #[must_use]
    pub fn stats(&self) -> &InventoryStats {
        &self.stats
    }

    /// Transition into Building unless a rebuild already holds it
    fn try_begin(&self) -> bool {
        let mut state = self.state.lock();
        if *state == InventoryState::Building {
            return false;
        }
        *state = InventoryState::Building;
        true
    }

    /// Walk the store root and publish a fresh snapshot
    ///
    /// Runs with the state guard already holding Building. Each rebuild
    /// walks from scratch; a failed walk never resumes and leaves the
    /// previous snapshot in place.
    fn rebuild(&self) {
        match self.walk_metrics() {
            Ok(names) => {
                info!(metrics = names.len(), "inventory rebuild complete");
                *self.snapshot.write() = Some(Arc::new(names));
                *self.state.lock() = InventoryState::Ready;
                self.stats.rebuilds.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!("inventory rebuild aborted: {e}");
                let had_snapshot = self.snapshot.read().is_some();
                *self.state.lock() = if had_snapshot {
                    InventoryState::Ready
                } else {
                    InventoryState::Empty
                };
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Collect every database file under the root, in discovery order
    fn walk_metrics(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(self.mapper.root()) {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("walk of metrics root failed: {e}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(metric) = self.mapper.path_to_metric(entry.path()) {
                names.push(metric.to_string());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn store_with_metrics(names: &[&str]) -> (TempDir, Arc<InventoryCache>) {
        let dir = tempdir().unwrap();
        let mapper = PathMapper::new(dir.path());
        for name in names {
            let path = mapper.metric_to_path(&name.parse().unwrap());
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"db").unwrap();
        }
        let cache = Arc::new(InventoryCache::new(mapper));
        (dir, cache)
    }

    async fn wait_ready(cache: &Arc<InventoryCache>) -> Arc<Vec<String>> {
        for _ in 0..200 {
            if let (Some(snapshot), true) = cache.get_snapshot() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("inventory never became ready");
    }

    #[test]
    fn test_walk_collects_database_files_only() {
        let (dir, cache) = store_with_metrics(&["servers.web01.cpu", "servers.web01.mem"]);
        std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        cache.rebuild();

        let (snapshot, ready) = cache.get_snapshot();
        assert!(ready);
        let mut names = snapshot.unwrap().as_ref().clone();
        names.sort();
        assert_eq!(names, vec!["servers.web01.cpu", "servers.web01.mem"]);
    }

    #[test]
    fn test_not_ready_while_building() {
        let (_dir, cache) = store_with_metrics(&["a.b"]);
        cache.rebuild();

        // A published snapshot is hidden while a new walk is in flight
        assert!(cache.try_begin());
        assert!(!cache.is_available());
        let (snapshot, ready) = cache.get_snapshot();
        assert!(!ready);
        assert!(snapshot.is_none());
    }

    #[test]
    fn test_single_rebuild_in_flight() {
        let (_dir, cache) = store_with_metrics(&[]);
        assert!(cache.try_begin());
        assert!(!cache.try_begin());

        cache.rebuild();
        assert!(cache.is_available());
        assert!(cache.try_begin());
    }

    #[test]
    fn test_walk_failure_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("metrics");
        std::fs::create_dir(&root).unwrap();
        let mapper = PathMapper::new(&root);
        let path = mapper.metric_to_path(&"a.b".parse().unwrap());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"db").unwrap();

        let cache = Arc::new(InventoryCache::new(mapper));
        cache.rebuild();
        assert_eq!(cache.stats().rebuilds.load(Ordering::Relaxed), 1);

        // Remove the root so the next walk aborts
        std::fs::remove_dir_all(&root).unwrap();
        assert!(cache.try_begin());
        cache.rebuild();

        assert_eq!(cache.stats().failures.load(Ordering::Relaxed), 1);
        let (snapshot, ready) = cache.get_snapshot();
        assert!(ready);
        assert_eq!(snapshot.unwrap().as_ref(), &vec!["a.b".to_string()]);
    }

    #[test]
    fn test_walk_failure_without_snapshot_resets_to_empty() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("never-created");
        let cache = Arc::new(InventoryCache::new(PathMapper::new(&root)));

        assert!(cache.try_begin());
        cache.rebuild();

        assert_eq!(cache.stats().failures.load(Ordering::Relaxed), 1);
        // Empty again: a later read may retry the build
        assert!(cache.is_available());
        assert!(cache.try_begin());
    }

    #[tokio::test]
    async fn test_first_read_triggers_build() {
        let (_dir, cache) = store_with_metrics(&["a.b", "c.d"]);

        let (snapshot, ready) = cache.get_snapshot();
        assert!(!ready);
        assert!(snapshot.is_none());

        let mut names = wait_ready(&cache).await.as_ref().clone();
        names.sort();
        assert_eq!(names, vec!["a.b", "c.d"]);
    }

    #[tokio::test]
    async fn test_forced_rebuild_picks_up_new_metrics() {
        let (dir, cache) = store_with_metrics(&["a.b"]);
        cache.trigger_rebuild();
        wait_ready(&cache).await;

        let mapper = PathMapper::new(dir.path());
        let path = mapper.metric_to_path(&"e.f".parse().unwrap());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"db").unwrap();

        assert!(cache.trigger_rebuild());
        let mut names = wait_ready(&cache).await.as_ref().clone();
        names.sort();
        assert_eq!(names, vec!["a.b", "e.f"]);
    }
}
