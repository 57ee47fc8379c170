//! Telemetry record types

use chrono::{DateTime, Utc};
use occupancy_status::StatusTier;
use sensor_fusion::MismatchLevel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column order of `UploadPacket::to_csv_row`
pub const UPLOAD_CSV_HEADER: &str = "upload_time,bus_id,passenger_count,gps_lat,gps_lon,status";

/// Outcome of one vision validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPacket {
    pub bus_id: String,
    pub ir_count: u32,
    pub camera_count: u32,
    pub validated: u32,
    pub validation_passed: bool,
    pub mismatch: MismatchLevel,
    pub timestamp: DateTime<Utc>,
}

/// Periodic occupancy upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPacket {
    pub timestamp: DateTime<Utc>,
    pub bus_id: String,
    pub passenger_count: u32,
    pub ir_count: u32,
    pub lat: f64,
    pub lon: f64,
    pub status: StatusTier,
}

impl UploadPacket {
    /// One CSV row matching `UPLOAD_CSV_HEADER`
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{:.4},{:.4},{}",
            self.timestamp.format("%H:%M:%S"),
            self.bus_id,
            self.passenger_count,
            self.lat,
            self.lon,
            self.status
        )
    }
}

/// Position report on stop arrival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub timestamp: DateTime<Utc>,
    pub bus_id: String,
    pub lat: f64,
    pub lon: f64,
    pub stop_name: String,
    pub passenger_count: u32,
}

/// Overcrowding alert for the transport authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub alert_type: StatusTier,
    pub bus_id: String,
    pub passenger_count: u32,
    pub occupancy_percent: f64,
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    pub action_required: String,
}

/// Any telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Validation(ValidationPacket),
    Upload(UploadPacket),
    Location(LocationUpdate),
    Alert(AlertRecord),
}

impl TelemetryRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryRecord::Validation(_) => "validation",
            TelemetryRecord::Upload(_) => "upload",
            TelemetryRecord::Location(_) => "location",
            TelemetryRecord::Alert(_) => "alert",
        }
    }
}
