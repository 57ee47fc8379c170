//! Telemetry Routes

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::{TelemetryRecord, UPLOAD_CSV_HEADER};

use crate::AppState;

const KNOWN_KINDS: [&str; 4] = ["validation", "upload", "location", "alert"];

/// Kinds returned when the query names none
const DEFAULT_KINDS: [&str; 2] = ["validation", "upload"];

/// Query parameters for telemetry endpoint
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Maximum number of records to return
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Restrict to one record kind
    pub kind: Option<String>,
}

fn default_limit() -> usize {
    100
}

/// Response for telemetry endpoint
#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    pub data: Vec<TelemetryRecord>,
    pub meta: TelemetryMeta,
}

#[derive(Debug, Serialize)]
pub struct TelemetryMeta {
    pub count: usize,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorBody { error: message }))
}

/// Get recent telemetry records, newest first
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TelemetryQuery>,
) -> Result<Json<TelemetryResponse>, ApiError> {
    let limit = params.limit.min(1000);

    let data = match params.kind.as_deref() {
        Some(kind) if KNOWN_KINDS.contains(&kind) => state.telemetry.recent_of_kind(kind, limit),
        Some(kind) => {
            return Err(error(
                StatusCode::BAD_REQUEST,
                format!("unknown telemetry kind '{}'", kind),
            ))
        }
        None => state.telemetry.recent_of_kinds(&DEFAULT_KINDS, limit),
    }
    .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(TelemetryResponse {
        meta: TelemetryMeta {
            count: data.len(),
            limit,
        },
        data,
    }))
}

/// Recent upload packets as CSV, oldest first
pub async fn get_uploads_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TelemetryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .telemetry
        .recent_of_kind("upload", params.limit.min(1000))
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut csv = String::from(UPLOAD_CSV_HEADER);
    csv.push('\n');
    for record in records.iter().rev() {
        if let TelemetryRecord::Upload(packet) = record {
            csv.push_str(&packet.to_csv_row());
            csv.push('\n');
        }
    }

    Ok(([(header::CONTENT_TYPE, "text/csv")], csv))
}
