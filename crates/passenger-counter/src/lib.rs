//! Passenger Counters
//!
//! Holds the two independently maintained passenger tallies:
//! - IR count, driven by boarding/alighting edges
//! - Vision count, replaced wholesale by each camera sample

mod counters;
mod error;

pub use counters::{CapacityPolicy, CounterConfig, CounterSnapshot, RawCounters};
pub use error::CounterError;
