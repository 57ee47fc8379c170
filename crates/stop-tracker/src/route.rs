//! Route table

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named stop on the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Typical load when leaving this stop
    pub avg_passengers: u32,
}

impl RouteStop {
    pub fn new(name: &str, lat: f64, lon: f64, avg_passengers: u32) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
            avg_passengers,
        }
    }
}

/// Stop detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopConfig {
    /// Motion readings below this count as stopped
    pub stopped_threshold: u32,
    /// How long the bus must stay stopped before it is at a stop (seconds)
    pub dwell_secs: u64,
    /// Location label before the first arrival
    pub depot_name: String,
    /// Stops in travel order, walked cyclically
    pub route: Vec<RouteStop>,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            stopped_threshold: 100,
            dwell_secs: 30,
            depot_name: "Terminal".to_string(),
            route: vec![
                RouteStop::new("Colombo Fort", 6.9271, 79.8612, 35),
                RouteStop::new("Pettah", 6.9356, 79.8487, 42),
                RouteStop::new("Maradana", 6.9287, 79.8631, 38),
                RouteStop::new("Borella", 6.9146, 79.8779, 30),
                RouteStop::new("Narahenpita", 6.9015, 79.8772, 25),
                RouteStop::new("Nugegoda", 6.8649, 79.8997, 15),
            ],
        }
    }
}

impl StopConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_secs)
    }
}
