//! Status tiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete occupancy band
///
/// Ratio banding uses the first four tiers, absolute banding the last three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusTier {
    Undercrowded,
    Normal,
    NearlyFull,
    Overcrowded,
    Green,
    Yellow,
    Red,
}

impl StatusTier {
    /// Most severe tier, the one that raises an overcrowding alert
    pub fn is_severe(self) -> bool {
        matches!(self, StatusTier::Overcrowded | StatusTier::Red)
    }

    /// Upper-case label used in logs and telemetry
    pub fn label(self) -> &'static str {
        match self {
            StatusTier::Undercrowded => "UNDERCROWDED",
            StatusTier::Normal => "NORMAL",
            StatusTier::NearlyFull => "NEARLY_FULL",
            StatusTier::Overcrowded => "OVERCROWDED",
            StatusTier::Green => "GREEN",
            StatusTier::Yellow => "YELLOW",
            StatusTier::Red => "RED",
        }
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Occupancy as a percentage of capacity
pub fn occupancy_percent(count: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    f64::from(count) / f64::from(capacity) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severe_tiers() {
        assert!(StatusTier::Overcrowded.is_severe());
        assert!(StatusTier::Red.is_severe());
        assert!(!StatusTier::NearlyFull.is_severe());
        assert!(!StatusTier::Yellow.is_severe());
    }

    #[test]
    fn test_occupancy_percent() {
        assert!((occupancy_percent(40, 50) - 80.0).abs() < f64::EPSILON);
        assert_eq!(occupancy_percent(10, 0), 0.0);
    }
}
