//! Metric name to filesystem path mapping
//!
//! The convention is fixed cluster-wide: each dot-separated name
//! component is one directory level under the store root, and the leaf
//! carries the database file extension. The mapping is pure and
//! reversible.

use seriesio_common::MetricName;
use std::path::{Path, PathBuf};

/// File extension for metric database files
pub const DB_FILE_EXT: &str = "tsd";

/// Maps metric names to paths under a fixed store root, and back
#[derive(Clone, Debug)]
pub struct PathMapper {
    root: PathBuf,
}

impl PathMapper {
    /// Create a mapper rooted at the metric store directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a metric name
    #[must_use]
    pub fn metric_to_path(&self, metric: &MetricName) -> PathBuf {
        let mut path = self.root.clone();
        for component in metric.as_str().split('.') {
            path.push(component);
        }
        path.set_extension(DB_FILE_EXT);
        path
    }

    /// Metric name for a filesystem path
    ///
    /// Returns None for paths outside the root or without the database
    /// file extension.
    #[must_use]
    pub fn path_to_metric(&self, path: &Path) -> Option<MetricName> {
        if path.extension()?.to_str()? != DB_FILE_EXT {
            return None;
        }
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");

        let mut name = String::new();
        for component in relative.components() {
            let component = component.as_os_str().to_str()?;
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(component);
        }
        MetricName::new(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_to_path() {
        let mapper = PathMapper::new("/srv/metrics");
        let name = MetricName::new("servers.web01.cpu.user").unwrap();
        assert_eq!(
            mapper.metric_to_path(&name),
            PathBuf::from("/srv/metrics/servers/web01/cpu/user.tsd")
        );
    }

    #[test]
    fn test_path_to_metric() {
        let mapper = PathMapper::new("/srv/metrics");
        let metric = mapper
            .path_to_metric(Path::new("/srv/metrics/servers/web01/cpu/user.tsd"))
            .unwrap();
        assert_eq!(metric.as_str(), "servers.web01.cpu.user");
    }

    #[test]
    fn test_round_trip() {
        let mapper = PathMapper::new("/srv/metrics");
        for name in ["a", "a.b", "servers.web-01.load_avg.01"] {
            let metric = MetricName::new(name).unwrap();
            let path = mapper.metric_to_path(&metric);
            assert_eq!(mapper.path_to_metric(&path).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_rejects_foreign_paths() {
        let mapper = PathMapper::new("/srv/metrics");
        assert!(mapper.path_to_metric(Path::new("/etc/passwd")).is_none());
        assert!(mapper
            .path_to_metric(Path::new("/srv/metrics/notes/readme.txt"))
            .is_none());
        assert!(mapper
            .path_to_metric(Path::new("/srv/metrics/servers/web01"))
            .is_none());
    }
}
