//! Telemetry
//!
//! Structured records emitted by the occupancy monitor:
//! - Validation packets on every vision validation pass
//! - Periodic upload packets (JSON or CSV row)
//! - Location updates on stop arrival
//! - Overcrowding alert records
//!
//! Transport is left to the sink; `TelemetryLog` keeps recent records in
//! memory and logs each one as JSON.

mod history;
mod record;

pub use history::TelemetryLog;
pub use record::{
    AlertRecord, LocationUpdate, TelemetryRecord, UploadPacket, ValidationPacket, UPLOAD_CSV_HEADER,
};

use thiserror::Error;

/// Telemetry errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Telemetry log lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Destination for telemetry records
pub trait TelemetrySink {
    fn emit(&mut self, record: TelemetryRecord) -> Result<(), TelemetryError>;
}
