//! This module defines the HTTP API endpoints over the session logger.
use crate::logging::Logger;
use crate::types::{ErrorInfo, ExportFormat, Level, LogEntry, LogFilter};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request structure for emitting one entry.
#[derive(Deserialize)]
pub struct LogRequest {
    /// The entry message.
    message: String,
    /// Structured data; any JSON value.
    #[serde(default)]
    data: Value,
    /// An error-like value, coerced into an error record.
    #[serde(default)]
    error: Option<Value>,
    /// Overrides the logger's context for this entry.
    #[serde(default)]
    context: Option<String>,
}

#[derive(Deserialize)]
pub struct InteractionRequest {
    action: String,
    element: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
pub struct LocationRequest {
    url: String,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct DownloadRequest {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    path: String,
}

#[derive(Deserialize, Default)]
pub struct TimerRequest {
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
pub struct TimerResponse {
    elapsed_ms: Option<f64>,
}

/// Records one entry; the level comes from the path and unknown names rank
/// as DEBUG.
pub async fn emit(
    State(logger): State<Logger>,
    Path(level): Path<String>,
    Json(req): Json<LogRequest>,
) -> StatusCode {
    let logger = match req.context {
        Some(context) => logger.with_context(context),
        None => logger,
    };
    let error = req.error.as_ref().map(ErrorInfo::from_value);
    logger.log(Level::parse_lenient(&level), req.message, req.data, error);
    StatusCode::NO_CONTENT
}

pub async fn track_interaction(
    State(logger): State<Logger>,
    Json(req): Json<InteractionRequest>,
) -> StatusCode {
    logger.track_interaction(&req.action, &req.element, req.data);
    StatusCode::NO_CONTENT
}

pub async fn set_location(
    State(logger): State<Logger>,
    Json(req): Json<LocationRequest>,
) -> StatusCode {
    logger.set_location(req.url);
    StatusCode::NO_CONTENT
}

pub async fn list_logs(
    State(logger): State<Logger>,
    Query(filter): Query<LogFilter>,
) -> Json<Vec<LogEntry>> {
    Json(logger.get_logs(&filter))
}

pub async fn list_errors(State(logger): State<Logger>) -> Json<Vec<LogEntry>> {
    Json(logger.get_errors())
}

pub async fn export_logs(
    State(logger): State<Logger>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let format = match query.format.as_deref().unwrap_or("json").parse::<ExportFormat>() {
        Ok(format) => format,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    match logger.export_logs(format) {
        Some(body) => ([(header::CONTENT_TYPE, format.content_type())], body).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn download_logs(
    State(logger): State<Logger>,
    body: Option<Json<DownloadRequest>>,
) -> Response {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    match logger.download_logs(req.filename.as_deref()) {
        Some(path) => Json(DownloadResponse {
            path: path.display().to_string(),
        })
        .into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn clear_logs(State(logger): State<Logger>) -> StatusCode {
    logger.clear_logs();
    StatusCode::NO_CONTENT
}

pub async fn start_timer(State(logger): State<Logger>, Path(label): Path<String>) -> StatusCode {
    logger.start_timer(&label);
    StatusCode::NO_CONTENT
}

/// Stops a timer. Responds 404 (with a null elapsed time) when the label was
/// never started.
pub async fn end_timer(
    State(logger): State<Logger>,
    Path(label): Path<String>,
    body: Option<Json<TimerRequest>>,
) -> (StatusCode, Json<TimerResponse>) {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let elapsed_ms = logger.end_timer(&label, req.data);
    let status = if elapsed_ms.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(TimerResponse { elapsed_ms }))
}
