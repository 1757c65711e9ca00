//! HTTP API for the node agent
//!
//! Routes:
//! - `GET/POST /metrics` - list the inventory, with optional `regex=`,
//!   `list=`, and `force=` parameters
//! - `HEAD/GET/DELETE/PUT/POST /metrics/{name}` - stat, fetch, remove,
//!   replace, or heal one metric's database file
//! - `GET /health` - liveness probe
//!
//! Method dispatch is explicit so unsupported methods get the API's
//! 400 rather than the router's default 405. Every failure is mapped
//! to a response at this boundary; nothing unwinds past a handler.

use axum::{
    body::Body,
    extract::{Path as UrlPath, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use seriesio_common::{Error, MetricName, MetricStat};
use seriesio_store::{
    decode_name_list, delete_metric, filter_list, filter_regex, read_metric, stat_metric,
    validate_upload, HealPipeline, InventoryCache, PathMapper,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Application state shared across handlers
pub struct AppState {
    pub mapper: PathMapper,
    pub inventory: Arc<InventoryCache>,
    pub heal: HealPipeline,
}

/// Build the node API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", any(list_metrics))
        // A trailing slash with no metric name is a client error
        .route("/metrics/", any(metric_name_missing))
        .route("/metrics/{*metric}", any(serve_metric))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Query parameters for inventory listing
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    /// Regex filter over metric names
    regex: Option<String>,
    /// JSON string-array filter of exact names
    list: Option<String>,
    /// Any non-empty value requests a cache rebuild first
    force: Option<String>,
}

/// List the metric inventory
async fn list_metrics(
    State(state): State<Arc<AppState>>,
    method: Method,
    Query(params): Query<ListParams>,
) -> Response {
    if method != Method::GET && method != Method::POST {
        return error_response(StatusCode::BAD_REQUEST, "bad request method");
    }

    if params.force.as_deref().is_some_and(|f| !f.is_empty()) && state.inventory.is_available() {
        state.inventory.trigger_rebuild();
    }

    let (snapshot, ready) = state.inventory.get_snapshot();
    let Some(snapshot) = snapshot.filter(|_| ready) else {
        return (StatusCode::ACCEPTED, "cache update in progress\n").into_response();
    };

    let mut metrics: Vec<String> = snapshot.as_ref().clone();
    if let Some(pattern) = params.regex.as_deref().filter(|p| !p.is_empty()) {
        match filter_regex(pattern, &metrics) {
            Ok(filtered) => metrics = filtered,
            Err(e) => return failure_response(&e),
        }
    }
    if let Some(raw) = params.list.as_deref().filter(|l| !l.is_empty()) {
        match decode_name_list(raw) {
            Ok(requested) => metrics = filter_list(&requested, &metrics),
            Err(e) => return failure_response(&e),
        }
    }

    match serde_json::to_vec(&metrics) {
        Ok(blob) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            blob,
        )
            .into_response(),
        Err(e) => {
            error!("error marshaling metric list: {e}");
            failure_response(&Error::Serialization(e.to_string()))
        }
    }
}

/// 400 for `/metrics/` with no metric name
async fn metric_name_missing() -> Response {
    error_response(StatusCode::BAD_REQUEST, "metric name missing")
}

/// Dispatch single-metric operations by method
async fn serve_metric(
    State(state): State<Arc<AppState>>,
    UrlPath(raw): UrlPath<String>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let metric = match raw.parse::<MetricName>() {
        Ok(metric) => metric,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let path = state.mapper.metric_to_path(&metric);

    match method {
        Method::HEAD => head_metric(&metric, &path),
        Method::GET => get_metric(&metric, &path),
        Method::DELETE => match delete_metric(metric.as_str(), &path, true) {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => failure_response(&e),
        },
        Method::PUT => {
            // Replace semantics: drop any existing file first so the
            // heal takes the install branch. A missing file is fine.
            if let Err(e) = delete_metric(metric.as_str(), &path, false) {
                return failure_response(&e);
            }
            heal_metric(&state, &metric, path, &headers, body).await
        }
        Method::POST => heal_metric(&state, &metric, path, &headers, body).await,
        _ => error_response(StatusCode::BAD_REQUEST, "bad request method"),
    }
}

/// Stat a metric and encode the result for the `X-Metric-Stat` header
fn stat_header(metric: &MetricName, path: &std::path::Path) -> Result<String, Error> {
    let stat: MetricStat = stat_metric(metric.as_str(), path)?;
    serde_json::to_string(&stat).map_err(|e| Error::Serialization(e.to_string()))
}

/// HEAD: stat only, no body
fn head_metric(metric: &MetricName, path: &std::path::Path) -> Response {
    match stat_header(metric, path) {
        Ok(blob) => ([("x-metric-stat", blob)], StatusCode::OK).into_response(),
        Err(e) if e.is_not_found() => StatusCode::NOT_FOUND.into_response(),
        Err(e) => failure_response(&e),
    }
}

/// GET: stat header plus the raw file bytes
fn get_metric(metric: &MetricName, path: &std::path::Path) -> Response {
    let blob = match stat_header(metric, path) {
        Ok(blob) => blob,
        Err(e) => return failure_response(&e),
    };
    match read_metric(metric.as_str(), path) {
        Ok(bytes) => (
            [
                ("x-metric-stat", blob.as_str()),
                (header::CONTENT_TYPE.as_str(), "application/octet-stream"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => failure_response(&e),
    }
}

/// Heal: validate the upload, then run the staged-write pipeline
async fn heal_metric(
    state: &AppState,
    metric: &MetricName,
    path: PathBuf,
    headers: &HeaderMap,
    body: Body,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = validate_upload(content_type, content_length) {
        warn!(metric = %metric, "rejecting heal request: {e}");
        return failure_response(&e);
    }

    match state.heal.ingest(&path, body.into_data_stream()).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => failure_response(&e),
    }
}

/// Build a plain-text error response
fn error_response(status: StatusCode, message: &str) -> Response {
    (status, format!("{message}\n")).into_response()
}

/// Map a store error onto the API's status codes
///
/// Server-side failures get a generic body; the details stay in the
/// log. Client errors carry their message so the caller can fix the
/// request.
fn failure_response(err: &Error) -> Response {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {err}");
        return error_response(status, "internal server error");
    }
    error_response(status, &err.to_string())
}
