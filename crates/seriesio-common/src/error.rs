//! Error types for SeriesIO
//!
//! This module defines the common error types used throughout the node agent.

use crate::types::MetricNameError;
use thiserror::Error;

/// Common result type for SeriesIO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for SeriesIO
#[derive(Debug, Error)]
pub enum Error {
    // Storage errors
    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metric not found: {metric}")]
    MetricNotFound { metric: String },

    #[error("database format error: {0}")]
    Format(String),

    // Heal/backfill errors
    #[error("merge failed: {0}")]
    Merge(String),

    // Listing errors
    #[error("invalid regex pattern: {0}")]
    Pattern(String),

    #[error("invalid metric list: {0}")]
    ListDecode(String),

    // Request errors
    #[error("invalid metric name: {0}")]
    InvalidMetricName(#[from] MetricNameError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a database format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a metric-not-found error
    pub fn not_found(metric: impl Into<String>) -> Self {
        Self::MetricNotFound {
            metric: metric.into(),
        }
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MetricNotFound { .. })
    }

    /// Get HTTP status code for the node API
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::Pattern(_)
            | Self::ListDecode(_)
            | Self::InvalidMetricName(_)
            | Self::InvalidRequest(_) => 400,

            // 404 Not Found
            Self::MetricNotFound { .. } => 404,

            // 500 Internal Server Error
            Self::Io(_)
            | Self::Format(_)
            | Self::Merge(_)
            | Self::Internal(_)
            | Self::Serialization(_) => 500,
        }
    }
}
