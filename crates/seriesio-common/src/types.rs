//! Core type definitions for SeriesIO
//!
//! This module defines the fundamental types used throughout the node
//! agent: metric identifiers and stat metadata.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::time::UNIX_EPOCH;
use thiserror::Error;

/// Smallest plausible database file: fixed header plus one archive
/// descriptor. Uploads must be strictly larger than this.
pub const MIN_DATABASE_SIZE: u64 = 28;

/// A validated metric identifier
///
/// Metric names are dot-separated paths (`servers.web01.cpu.user`).
/// Each component maps to one directory level on disk, so components
/// that are empty or filesystem-special are rejected up front.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct MetricName(String);

/// Metric name validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricNameError {
    #[error("metric name is empty")]
    Empty,

    #[error("metric name component is empty")]
    EmptyComponent,

    #[error("metric name component {0:?} is not allowed")]
    ReservedComponent(String),
}

impl MetricName {
    /// Create a new metric name, validating the path-mapping rules
    pub fn new(name: impl Into<String>) -> Result<Self, MetricNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Create without validation (internal use only)
    #[must_use]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the metric name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> Result<(), MetricNameError> {
        if name.is_empty() {
            return Err(MetricNameError::Empty);
        }
        for component in name.split('.') {
            if component.is_empty() {
                return Err(MetricNameError::EmptyComponent);
            }
            if component.contains('/') || component == "~" {
                return Err(MetricNameError::ReservedComponent(component.to_string()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MetricName({})", self.0)
    }
}

impl std::str::FromStr for MetricName {
    type Err = MetricNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A JSON-marshalable view of one metric file's stat data
///
/// Field names stay PascalCase on the wire; peers parse the
/// `X-Metric-Stat` header by these exact keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricStat {
    /// Metric name
    pub name: String,
    /// File size in bytes
    pub size: i64,
    /// Unix mode bits
    pub mode: u32,
    /// Modification time as a unix timestamp
    pub mod_time: i64,
}

impl MetricStat {
    /// Build a stat record from filesystem metadata
    #[must_use]
    pub fn from_metadata(name: &str, meta: &Metadata) -> Self {
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::MetadataExt;
            meta.mode()
        };
        #[cfg(not(unix))]
        let mode = 0;

        let mod_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs() as i64);

        Self {
            name: name.to_string(),
            size: meta.len() as i64,
            mode,
            mod_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_valid() {
        let name = MetricName::new("servers.web01.cpu.user").unwrap();
        assert_eq!(name.as_str(), "servers.web01.cpu.user");

        assert!(MetricName::new("a").is_ok());
        assert!(MetricName::new("a.b-c.d_e").is_ok());
    }

    #[test]
    fn test_metric_name_invalid() {
        assert_eq!(MetricName::new(""), Err(MetricNameError::Empty));
        assert_eq!(
            MetricName::new("a..b"),
            Err(MetricNameError::EmptyComponent)
        );
        assert_eq!(
            MetricName::new(".leading"),
            Err(MetricNameError::EmptyComponent)
        );
        assert_eq!(
            MetricName::new("trailing."),
            Err(MetricNameError::EmptyComponent)
        );
        assert!(matches!(
            MetricName::new("a.b/c.d"),
            Err(MetricNameError::ReservedComponent(_))
        ));
    }

    #[test]
    fn test_metric_stat_wire_format() {
        let stat = MetricStat {
            name: "servers.web01.cpu".to_string(),
            size: 1024,
            mode: 0o100644,
            mod_time: 1_700_000_000,
        };
        let blob = serde_json::to_string(&stat).unwrap();
        assert!(blob.contains("\"Name\":\"servers.web01.cpu\""));
        assert!(blob.contains("\"Size\":1024"));
        assert!(blob.contains("\"Mode\":"));
        assert!(blob.contains("\"ModTime\":1700000000"));

        let parsed: MetricStat = serde_json::from_str(&blob).unwrap();
        assert_eq!(parsed, stat);
    }
}
