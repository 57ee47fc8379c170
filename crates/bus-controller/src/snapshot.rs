//! Read-only copies of controller state

use chrono::{DateTime, Utc};
use occupancy_status::StatusTier;
use sensor_fusion::MismatchLevel;
use serde::{Deserialize, Serialize};
use stop_tracker::LegTally;

/// What the occupancy display shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub validated: u32,
    pub capacity: u32,
    pub status: StatusTier,
    pub location_label: String,
    pub at_stop: bool,
    pub daily_passengers: u64,
}

/// Full occupancy picture published to outside readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub bus_id: String,
    pub route: String,
    pub timestamp: DateTime<Utc>,
    pub validated: u32,
    pub capacity: u32,
    pub occupancy_percent: f64,
    pub status: StatusTier,
    pub ir_count: u32,
    pub camera_count: u32,
    pub mismatch: MismatchLevel,
    pub current_stop: String,
    pub next_stop: String,
    pub at_stop: bool,
    pub lat: f64,
    pub lon: f64,
    pub daily_passengers: u64,
    pub leg: LegTally,
    pub alerts_fired: u64,
}
