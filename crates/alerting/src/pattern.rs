//! Audible alert patterns

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Pattern configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Beep pattern needs at least one pulse")]
    NoPulses,

    #[error("Beep pulse length must be positive")]
    ZeroPulse,
}

/// Buzzer on/off sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeepPattern {
    pub pulses: u32,
    pub on_ms: u64,
    pub off_ms: u64,
}

impl BeepPattern {
    /// Three short pulses for an overcrowding alert
    pub fn overcrowding() -> Self {
        Self {
            pulses: 3,
            on_ms: 100,
            off_ms: 100,
        }
    }

    /// One long pulse when a boarding is refused
    pub fn entry_denied() -> Self {
        Self {
            pulses: 1,
            on_ms: 500,
            off_ms: 0,
        }
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        if self.pulses == 0 {
            return Err(PatternError::NoPulses);
        }
        if self.on_ms == 0 {
            return Err(PatternError::ZeroPulse);
        }
        Ok(())
    }

    /// Buzzer level and hold time for each step of the pattern
    pub fn steps(&self) -> impl Iterator<Item = (bool, Duration)> + '_ {
        (0..self.pulses).flat_map(move |_| {
            [
                (true, Duration::from_millis(self.on_ms)),
                (false, Duration::from_millis(self.off_ms)),
            ]
        })
    }

    /// Wall time the pattern blocks for
    pub fn duration(&self) -> Duration {
        Duration::from_millis((self.on_ms + self.off_ms) * u64::from(self.pulses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overcrowding_pattern() {
        let pattern = BeepPattern::overcrowding();
        let steps: Vec<_> = pattern.steps().collect();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps.iter().filter(|(on, _)| *on).count(), 3);
        assert_eq!(pattern.duration(), Duration::from_millis(600));
    }

    #[test]
    fn test_invalid_patterns() {
        let empty = BeepPattern {
            pulses: 0,
            ..BeepPattern::overcrowding()
        };
        assert_eq!(empty.validate(), Err(PatternError::NoPulses));

        let silent = BeepPattern {
            on_ms: 0,
            ..BeepPattern::entry_denied()
        };
        assert_eq!(silent.validate(), Err(PatternError::ZeroPulse));
    }
}
