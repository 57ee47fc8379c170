//! IR and Vision Tallies

use crate::error::CounterError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How boarding behaves once the bus reaches capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Refuse boarding at capacity and signal `CapacityExceeded`
    Enforce,
    /// Keep counting past capacity, fusion clamps the validated value
    Unbounded,
}

/// Counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Seated + standing capacity of the bus
    pub capacity: u32,
    /// How far a vision sample may exceed capacity before clamping
    pub overflow_margin: u32,
    /// Boarding behavior at capacity
    pub capacity_policy: CapacityPolicy,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl CounterConfig {
    /// Demonstration bus: 50 seats, boarding refused when full
    pub fn demo() -> Self {
        Self {
            capacity: 50,
            overflow_margin: 3,
            capacity_policy: CapacityPolicy::Enforce,
        }
    }

    /// Requirements profile: absolute bands up to 80+, no entry refusal
    pub fn requirements() -> Self {
        Self {
            capacity: 100,
            overflow_margin: 0,
            capacity_policy: CapacityPolicy::Unbounded,
        }
    }

    /// Upper bound accepted for a vision sample
    pub fn vision_ceiling(&self) -> u32 {
        self.capacity.saturating_add(self.overflow_margin)
    }
}

/// Copy of the counter state handed to collaborators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub ir_count: u32,
    pub camera_count: u32,
    pub lifetime_boardings: u64,
    pub lifetime_alightings: u64,
    pub daily_passengers: u64,
}

/// Raw passenger counters
#[derive(Debug, Clone)]
pub struct RawCounters {
    config: CounterConfig,
    ir_count: u32,
    camera_count: u32,
    lifetime_boardings: u64,
    lifetime_alightings: u64,
    daily_passengers: u64,
}

impl RawCounters {
    /// Create empty counters
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            ir_count: 0,
            camera_count: 0,
            lifetime_boardings: 0,
            lifetime_alightings: 0,
            daily_passengers: 0,
        }
    }

    /// Record one passenger boarding
    ///
    /// Under `CapacityPolicy::Enforce` a full bus refuses the boarding and
    /// leaves every tally untouched.
    pub fn record_boarding(&mut self) -> Result<u32, CounterError> {
        if self.config.capacity_policy == CapacityPolicy::Enforce
            && self.ir_count >= self.config.capacity
        {
            warn!(
                "Boarding denied at capacity {}/{}",
                self.ir_count, self.config.capacity
            );
            return Err(CounterError::CapacityExceeded {
                count: self.ir_count,
                capacity: self.config.capacity,
            });
        }

        self.ir_count = self.ir_count.saturating_add(1);
        self.lifetime_boardings += 1;
        self.daily_passengers += 1;
        debug!("Boarding recorded, ir count {}", self.ir_count);
        Ok(self.ir_count)
    }

    /// Record one passenger alighting
    ///
    /// Returns `false` when the bus is already empty.
    pub fn record_alighting(&mut self) -> bool {
        if self.ir_count == 0 {
            debug!("Alighting ignored, bus empty");
            return false;
        }

        self.ir_count -= 1;
        self.lifetime_alightings += 1;
        debug!("Alighting recorded, ir count {}", self.ir_count);
        true
    }

    /// Replace the vision count with a fresh sample
    pub fn submit_vision_sample(&mut self, count: u32) {
        self.camera_count = count.min(self.config.vision_ceiling());
    }

    /// Current IR count
    pub fn ir_count(&self) -> u32 {
        self.ir_count
    }

    /// Latest vision count
    pub fn camera_count(&self) -> u32 {
        self.camera_count
    }

    /// Configured capacity
    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Passengers counted since process start
    pub fn daily_passengers(&self) -> u64 {
        self.daily_passengers
    }

    /// Snapshot of every tally
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ir_count: self.ir_count,
            camera_count: self.camera_count,
            lifetime_boardings: self.lifetime_boardings,
            lifetime_alightings: self.lifetime_alightings,
            daily_passengers: self.daily_passengers,
        }
    }
}

impl Default for RawCounters {
    fn default() -> Self {
        Self::new(CounterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boarding_refused_at_capacity() {
        let mut counters = RawCounters::new(CounterConfig {
            capacity: 2,
            ..CounterConfig::demo()
        });

        assert_eq!(counters.record_boarding(), Ok(1));
        assert_eq!(counters.record_boarding(), Ok(2));
        assert_eq!(
            counters.record_boarding(),
            Err(CounterError::CapacityExceeded { count: 2, capacity: 2 })
        );

        // Denied boarding mutates nothing
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.ir_count, 2);
        assert_eq!(snapshot.lifetime_boardings, 2);
        assert_eq!(snapshot.daily_passengers, 2);
    }

    #[test]
    fn test_unbounded_boarding_exceeds_capacity() {
        let mut counters = RawCounters::new(CounterConfig {
            capacity: 1,
            ..CounterConfig::requirements()
        });

        counters.record_boarding().unwrap();
        counters.record_boarding().unwrap();
        assert_eq!(counters.ir_count(), 2);
    }

    #[test]
    fn test_alighting_never_negative() {
        let mut counters = RawCounters::default();
        assert!(!counters.record_alighting());
        assert_eq!(counters.ir_count(), 0);
        assert_eq!(counters.snapshot().lifetime_alightings, 0);

        counters.record_boarding().unwrap();
        assert!(counters.record_alighting());
        assert_eq!(counters.ir_count(), 0);
        assert_eq!(counters.snapshot().lifetime_alightings, 1);
    }

    #[test]
    fn test_vision_sample_replaces_count() {
        let mut counters = RawCounters::default();
        counters.submit_vision_sample(12);
        counters.submit_vision_sample(7);
        assert_eq!(counters.camera_count(), 7);

        // Clamped to capacity + overflow margin
        counters.submit_vision_sample(500);
        assert_eq!(counters.camera_count(), 53);
    }

    proptest! {
        #[test]
        fn prop_enforced_count_stays_in_bounds(
            events in proptest::collection::vec(any::<bool>(), 0..400),
        ) {
            let mut counters = RawCounters::default();
            for boarding in events {
                if boarding {
                    let _ = counters.record_boarding();
                } else {
                    counters.record_alighting();
                }
                prop_assert!(counters.ir_count() <= counters.capacity());
            }
        }
    }
}
