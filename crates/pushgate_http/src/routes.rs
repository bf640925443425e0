//! Route handlers for the terminal wire and the admin seam.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use pushgate_server::{AttendanceEvent, AttendanceSession, DeviceQuery, PushServer, ServerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error wrapper mapping subsystem failures onto HTTP statuses.
///
/// Only a store failure ever reaches a terminal as non-OK; it maps to 500
/// so the device legitimately retries the batch.
#[derive(Error, Debug)]
pub enum AppError {
    /// Subsystem error.
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Server(err) = self;
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, err.to_string()).into_response()
    }
}

/// Query parameters terminals send on the shared data endpoint.
#[derive(Debug, Deserialize)]
pub struct CdataParams {
    /// Terminal serial number.
    #[serde(rename = "SN")]
    sn: Option<String>,
    /// Upload target table.
    table: Option<String>,
    /// Legacy capability-discovery marker.
    options: Option<String>,
    /// Advertised push-protocol version.
    pushver: Option<String>,
}

impl From<CdataParams> for DeviceQuery {
    fn from(params: CdataParams) -> Self {
        DeviceQuery {
            serial: params.sn,
            table: params.table,
            options: params.options,
            push_version: params.pushver,
        }
    }
}

/// Query parameters on the mailbox and acknowledgement endpoints.
#[derive(Debug, Deserialize)]
pub struct SerialParam {
    /// Terminal serial number.
    #[serde(rename = "SN")]
    sn: Option<String>,
}

/// `GET /iclock/cdata`: discovery or capability poll.
pub async fn cdata_get(
    State(server): State<Arc<PushServer>>,
    Query(params): Query<CdataParams>,
) -> String {
    server.handle_cdata_get(&params.into()).into_body()
}

/// `POST /iclock/cdata`: data upload.
///
/// The body is decoded lossily; firmware occasionally emits stray bytes in
/// raw fields and a whole batch must not bounce over them.
pub async fn cdata_post(
    State(server): State<Arc<PushServer>>,
    Query(params): Query<CdataParams>,
    body: Bytes,
) -> Result<String, AppError> {
    let text = String::from_utf8_lossy(&body);
    let response = server.handle_cdata_post(&params.into(), &text)?;
    Ok(response.into_body())
}

/// `GET /iclock/getrequest`: mailbox poll.
pub async fn getrequest(
    State(server): State<Arc<PushServer>>,
    Query(params): Query<SerialParam>,
) -> String {
    server
        .handle_getrequest(params.sn.as_deref().unwrap_or_default())
        .into_body()
}

/// `POST /iclock/devicecmd`: command acknowledgement.
pub async fn devicecmd(
    State(server): State<Arc<PushServer>>,
    Query(params): Query<SerialParam>,
    body: Bytes,
) -> String {
    let text = String::from_utf8_lossy(&body);
    server
        .handle_devicecmd(params.sn.as_deref(), &text)
        .into_body()
}

/// Result cap query for the event listing.
#[derive(Debug, Deserialize)]
pub struct LimitParam {
    /// Maximum events to return.
    limit: Option<usize>,
}

const DEFAULT_EVENT_LIMIT: usize = 50;

/// `GET /api/events/{badge}`: recent events for a badge, newest first.
pub async fn events_for_badge(
    State(server): State<Arc<PushServer>>,
    Path(badge): Path<String>,
    Query(params): Query<LimitParam>,
) -> Result<Json<Vec<AttendanceEvent>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    Ok(Json(server.recent_events(&badge, limit)?))
}

/// Date selector for the session listing.
#[derive(Debug, Deserialize)]
pub struct DateParam {
    /// Session date; defaults to today.
    date: Option<NaiveDate>,
}

/// `GET /api/sessions/{badge}`: sessions for a badge on one date.
pub async fn sessions_for_badge(
    State(server): State<Arc<PushServer>>,
    Path(badge): Path<String>,
    Query(params): Query<DateParam>,
) -> Result<Json<Vec<AttendanceSession>>, AppError> {
    let date = params
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok(Json(server.sessions_on(&badge, date)?))
}

/// Operator request to queue a command for a terminal.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// Target terminal serial number.
    pub serial: String,
    /// Command text to dispatch on the next mailbox poll.
    pub command: String,
}

/// Reply to a command enqueue.
#[derive(Debug, Serialize)]
pub struct EnqueueReply {
    /// False when a command was already pending for the serial.
    pub fresh: bool,
}

/// `POST /api/command`: queue a command for a terminal.
pub async fn enqueue_command(
    State(server): State<Arc<PushServer>>,
    Json(request): Json<EnqueueRequest>,
) -> Json<EnqueueReply> {
    let fresh = server.enqueue_command(&request.serial, request.command);
    Json(EnqueueReply { fresh })
}
