//! Stop Tracker
//!
//! Infers whether the bus is moving or standing at a stop from a motion
//! proxy signal, and walks a fixed cyclic route on every arrival.

mod route;
mod tracker;

pub use route::{RouteStop, StopConfig};
pub use tracker::{Arrival, Departure, LegTally, MotionState, StopEvent, StopTracker};

use thiserror::Error;

/// Stop tracker errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StopError {
    #[error("Route has no stops")]
    EmptyRoute,
}
