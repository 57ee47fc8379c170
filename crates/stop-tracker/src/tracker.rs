//! Moving / stationary state machine

use crate::route::{RouteStop, StopConfig};
use crate::StopError;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Vehicle motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Moving,
    Stationary,
}

/// Boardings and alightings since the last departure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegTally {
    pub boardings: u32,
    pub alightings: u32,
}

/// Bus came to rest at a stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub stop_index: usize,
    pub stop: RouteStop,
    pub next_stop: String,
}

/// Bus left a stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Departure {
    pub stop: String,
    /// Tally for the leg that just ended, already reset in the tracker
    pub leg: LegTally,
}

/// Events emitted on motion state changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopEvent {
    Arrived(Arrival),
    Departed(Departure),
}

/// Stop tracker
///
/// Owns the stop context: arrivals and departures are its only write path.
#[derive(Debug, Clone)]
pub struct StopTracker {
    config: StopConfig,
    state: MotionState,
    stop_index: usize,
    current_stop: String,
    next_stop: String,
    position: (f64, f64),
    /// Time of the last sample at or above the stopped threshold
    last_motion: Instant,
    stationary_since: Option<Instant>,
    leg: LegTally,
}

impl StopTracker {
    /// Create a tracker parked at the depot, counting dwell from `now`
    pub fn new(config: StopConfig, now: Instant) -> Result<Self, StopError> {
        let first = config.route.first().ok_or(StopError::EmptyRoute)?;
        let next_stop = first.name.clone();
        let position = (first.lat, first.lon);

        Ok(Self {
            current_stop: config.depot_name.clone(),
            next_stop,
            position,
            config,
            state: MotionState::Moving,
            stop_index: 0,
            last_motion: now,
            stationary_since: None,
            leg: LegTally::default(),
        })
    }

    /// Feed one motion sample
    pub fn sample(&mut self, motion: u32, now: Instant) -> Option<StopEvent> {
        if motion < self.config.stopped_threshold {
            let still_for = now.saturating_duration_since(self.last_motion);
            if self.state == MotionState::Moving && still_for >= self.config.dwell() {
                return Some(StopEvent::Arrived(self.arrive()));
            }
            return None;
        }

        self.last_motion = now;
        if self.state == MotionState::Stationary {
            return Some(StopEvent::Departed(self.depart()));
        }
        None
    }

    fn arrive(&mut self) -> Arrival {
        let count = self.config.route.len();
        self.stop_index = (self.stop_index + 1) % count;

        let stop = self.config.route[self.stop_index].clone();
        self.next_stop = self.config.route[(self.stop_index + 1) % count].name.clone();
        self.current_stop = stop.name.clone();
        self.position = (stop.lat, stop.lon);
        self.state = MotionState::Stationary;
        self.stationary_since = Some(self.last_motion);

        info!("=== ARRIVED at {} === next stop: {}", stop.name, self.next_stop);

        Arrival {
            stop_index: self.stop_index,
            stop,
            next_stop: self.next_stop.clone(),
        }
    }

    fn depart(&mut self) -> Departure {
        let leg = std::mem::take(&mut self.leg);
        self.state = MotionState::Moving;
        self.stationary_since = None;

        info!(
            "=== DEPARTED from {} === boarded: {} | alighted: {}",
            self.current_stop, leg.boardings, leg.alightings
        );

        Departure {
            stop: self.current_stop.clone(),
            leg,
        }
    }

    pub fn record_leg_boarding(&mut self) {
        self.leg.boardings += 1;
    }

    pub fn record_leg_alighting(&mut self) {
        self.leg.alightings += 1;
    }

    pub fn leg(&self) -> LegTally {
        self.leg
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn at_stop(&self) -> bool {
        self.state == MotionState::Stationary
    }

    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    /// Current location label
    pub fn current_stop(&self) -> &str {
        &self.current_stop
    }

    pub fn next_stop(&self) -> &str {
        &self.next_stop
    }

    /// Latitude and longitude of the last known stop
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn stationary_since(&self) -> Option<Instant> {
        self.stationary_since
    }
}
