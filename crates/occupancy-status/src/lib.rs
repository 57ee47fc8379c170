//! Occupancy Status
//!
//! Maps a validated passenger count onto a discrete status tier:
//! - Ratio bands against capacity (undercrowded .. overcrowded)
//! - Absolute bands on the raw count (green / yellow / red)
//!
//! Tier transitions drive every status side effect downstream.

pub mod classifier;
pub mod indicator;
pub mod tier;

pub use classifier::{BandingPolicy, OccupancyClassifier, StatusConfig, Transition};
pub use indicator::IndicatorState;
pub use tier::{occupancy_percent, StatusTier};

use thiserror::Error;

/// Status configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Capacity must be positive")]
    ZeroCapacity,

    #[error("Band thresholds must be strictly increasing: {0:?}")]
    UnorderedBands(Vec<u32>),
}
