//! Tier classification and transition detection

use crate::tier::StatusTier;
use crate::StatusError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which banding rule maps counts onto tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandingPolicy {
    /// Percent of capacity: undercrowded / normal / nearly full / overcrowded
    Ratio,
    /// Raw passenger count: green / yellow / red
    Absolute,
}

/// Status banding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub banding: BandingPolicy,
    /// Ratio: below this percent is undercrowded
    pub normal_from_percent: u32,
    /// Ratio: from this percent the bus is nearly full
    pub nearly_full_from_percent: u32,
    /// Ratio: from this percent the bus is overcrowded
    pub overcrowded_from_percent: u32,
    /// Absolute: highest green count
    pub green_max: u32,
    /// Absolute: highest yellow count
    pub yellow_max: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl StatusConfig {
    /// Capacity-relative bands
    pub fn demo() -> Self {
        Self {
            banding: BandingPolicy::Ratio,
            normal_from_percent: 40,
            nearly_full_from_percent: 60,
            overcrowded_from_percent: 80,
            green_max: 50,
            yellow_max: 80,
        }
    }

    /// 0-50 green, 51-80 yellow, above 80 red
    pub fn requirements() -> Self {
        Self {
            banding: BandingPolicy::Absolute,
            ..Self::demo()
        }
    }

    /// Check that the active bands are strictly increasing
    pub fn validate(&self) -> Result<(), StatusError> {
        let bands = match self.banding {
            BandingPolicy::Ratio => vec![
                self.normal_from_percent,
                self.nearly_full_from_percent,
                self.overcrowded_from_percent,
            ],
            BandingPolicy::Absolute => vec![self.green_max, self.yellow_max],
        };
        if bands.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(StatusError::UnorderedBands(bands));
        }
        Ok(())
    }

    /// Tier the classifier reports before the first count arrives
    pub fn initial_tier(&self) -> StatusTier {
        match self.banding {
            BandingPolicy::Ratio => StatusTier::Normal,
            BandingPolicy::Absolute => StatusTier::Green,
        }
    }
}

/// A change of status tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: StatusTier,
    pub to: StatusTier,
}

/// Occupancy classifier holding the current and previous tier
#[derive(Debug, Clone)]
pub struct OccupancyClassifier {
    config: StatusConfig,
    capacity: u32,
    current: StatusTier,
    previous: StatusTier,
}

impl OccupancyClassifier {
    /// Create a classifier for a bus of `capacity`
    pub fn new(config: StatusConfig, capacity: u32) -> Result<Self, StatusError> {
        if capacity == 0 {
            return Err(StatusError::ZeroCapacity);
        }
        config.validate()?;

        let initial = config.initial_tier();
        Ok(Self {
            config,
            capacity,
            current: initial,
            previous: initial,
        })
    }

    /// Tier for a validated count
    pub fn classify(&self, validated: u32) -> StatusTier {
        let cfg = &self.config;
        match cfg.banding {
            BandingPolicy::Ratio => {
                // count / capacity < p / 100, kept in integers
                let scaled = u64::from(validated) * 100;
                let below = |percent: u32| scaled < u64::from(percent) * u64::from(self.capacity);

                if below(cfg.normal_from_percent) {
                    StatusTier::Undercrowded
                } else if below(cfg.nearly_full_from_percent) {
                    StatusTier::Normal
                } else if below(cfg.overcrowded_from_percent) {
                    StatusTier::NearlyFull
                } else {
                    StatusTier::Overcrowded
                }
            }
            BandingPolicy::Absolute => {
                if validated <= cfg.green_max {
                    StatusTier::Green
                } else if validated <= cfg.yellow_max {
                    StatusTier::Yellow
                } else {
                    StatusTier::Red
                }
            }
        }
    }

    /// Store a freshly computed tier, returning the transition if it changed
    pub fn update(&mut self, tier: StatusTier) -> Option<Transition> {
        if tier == self.current {
            return None;
        }

        self.previous = self.current;
        self.current = tier;
        info!(">>> STATUS CHANGED: {} -> {} <<<", self.previous, self.current);

        Some(Transition {
            from: self.previous,
            to: self.current,
        })
    }

    /// Classify and update in one step
    pub fn observe(&mut self, validated: u32) -> Option<Transition> {
        let tier = self.classify(validated);
        self.update(tier)
    }

    pub fn current(&self) -> StatusTier {
        self.current
    }

    pub fn previous(&self) -> StatusTier {
        self.previous
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_band_edges() {
        let classifier = OccupancyClassifier::new(StatusConfig::demo(), 50).unwrap();
        assert_eq!(classifier.classify(0), StatusTier::Undercrowded);
        assert_eq!(classifier.classify(19), StatusTier::Undercrowded);
        assert_eq!(classifier.classify(20), StatusTier::Normal);
        assert_eq!(classifier.classify(29), StatusTier::Normal);
        assert_eq!(classifier.classify(30), StatusTier::NearlyFull);
        assert_eq!(classifier.classify(39), StatusTier::NearlyFull);
        assert_eq!(classifier.classify(40), StatusTier::Overcrowded);
        assert_eq!(classifier.classify(50), StatusTier::Overcrowded);
    }

    #[test]
    fn test_absolute_band_edges() {
        let classifier = OccupancyClassifier::new(StatusConfig::requirements(), 100).unwrap();
        assert_eq!(classifier.classify(0), StatusTier::Green);
        assert_eq!(classifier.classify(50), StatusTier::Green);
        assert_eq!(classifier.classify(51), StatusTier::Yellow);
        assert_eq!(classifier.classify(80), StatusTier::Yellow);
        assert_eq!(classifier.classify(81), StatusTier::Red);
    }

    #[test]
    fn test_absolute_bands_ignore_capacity() {
        let classifier = OccupancyClassifier::new(StatusConfig::requirements(), 10).unwrap();
        assert_eq!(classifier.classify(50), StatusTier::Green);
    }

    #[test]
    fn test_update_reports_only_changes() {
        let mut classifier = OccupancyClassifier::new(StatusConfig::requirements(), 100).unwrap();
        assert_eq!(classifier.current(), StatusTier::Green);

        assert_eq!(classifier.update(StatusTier::Green), None);
        assert_eq!(
            classifier.update(StatusTier::Red),
            Some(Transition {
                from: StatusTier::Green,
                to: StatusTier::Red,
            })
        );
        assert_eq!(classifier.update(StatusTier::Red), None);
        assert_eq!(classifier.update(StatusTier::Red), None);
        assert_eq!(classifier.previous(), StatusTier::Green);
    }

    #[test]
    fn test_empty_bus_leaves_initial_normal() {
        let mut classifier = OccupancyClassifier::new(StatusConfig::demo(), 50).unwrap();
        let transition = classifier.observe(0).unwrap();
        assert_eq!(transition.from, StatusTier::Normal);
        assert_eq!(transition.to, StatusTier::Undercrowded);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            OccupancyClassifier::new(StatusConfig::demo(), 0).unwrap_err(),
            StatusError::ZeroCapacity
        );

        let config = StatusConfig {
            green_max: 90,
            ..StatusConfig::requirements()
        };
        assert!(matches!(
            OccupancyClassifier::new(config, 100),
            Err(StatusError::UnorderedBands(_))
        ));
    }
}
