//! Counter Error Types

use thiserror::Error;

/// Errors raised by the passenger counters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    /// Boarding refused because the bus is already at capacity
    #[error("Bus full: {count}/{capacity} passengers, entry denied")]
    CapacityExceeded { count: u32, capacity: u32 },
}
