//! Indicator LED states

use crate::tier::StatusTier;
use serde::{Deserialize, Serialize};

/// Driver-panel LED states, a pure function of tier and mismatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorState {
    pub green: bool,
    pub yellow: bool,
    pub red: bool,
    pub mismatch: bool,
}

impl IndicatorState {
    /// Exactly one status LED lit for `tier`
    pub fn for_tier(tier: StatusTier, mismatch: bool) -> Self {
        let mut state = Self {
            mismatch,
            ..Self::default()
        };
        match tier {
            StatusTier::Undercrowded | StatusTier::Normal | StatusTier::Green => state.green = true,
            StatusTier::NearlyFull | StatusTier::Yellow => state.yellow = true,
            StatusTier::Overcrowded | StatusTier::Red => state.red = true,
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_led_per_tier() {
        let tiers = [
            StatusTier::Undercrowded,
            StatusTier::Normal,
            StatusTier::NearlyFull,
            StatusTier::Overcrowded,
            StatusTier::Green,
            StatusTier::Yellow,
            StatusTier::Red,
        ];
        for tier in tiers {
            let state = IndicatorState::for_tier(tier, false);
            let lit = [state.green, state.yellow, state.red]
                .iter()
                .filter(|on| **on)
                .count();
            assert_eq!(lit, 1, "{tier}");
        }
    }

    #[test]
    fn test_severe_lights_red() {
        let state = IndicatorState::for_tier(StatusTier::Overcrowded, true);
        assert!(state.red);
        assert!(state.mismatch);
        assert!(!state.green);
    }
}
