//! Alert Policy Implementation

use crate::pattern::{BeepPattern, PatternError};
use occupancy_status::StatusTier;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Pattern played when an overcrowding alert fires
    pub overcrowding_pattern: BeepPattern,
    /// Pattern played when a boarding is refused at capacity
    pub entry_denied_pattern: BeepPattern,
    /// Instruction attached to every alert record
    pub action_required: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            overcrowding_pattern: BeepPattern::overcrowding(),
            entry_denied_pattern: BeepPattern::entry_denied(),
            action_required: "Deploy additional bus".to_string(),
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), PatternError> {
        self.overcrowding_pattern.validate()?;
        self.entry_denied_pattern.validate()
    }
}

/// Request to the output collaborators when an alert fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertAction {
    /// Tier that raised the alert
    pub tier: StatusTier,
    /// Buzzer pattern to play
    pub pattern: BeepPattern,
    /// Instruction for the alert record
    pub action_required: String,
}

/// Overcrowding alert latch
///
/// Armed on first entry to the severe tier, disarmed as soon as status
/// leaves it.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    config: AlertConfig,
    armed: bool,
    fired: u64,
}

impl AlertPolicy {
    /// Create a new alert policy
    pub fn new(config: AlertConfig) -> Self {
        debug!("Creating alert policy with config: {:?}", config);
        Self {
            config,
            armed: false,
            fired: 0,
        }
    }

    /// Observe the current status tier
    ///
    /// Repeated calls with the same tier are harmless: at most one action is
    /// returned per continuous dwell in the severe tier.
    pub fn on_status_transition(&mut self, to: StatusTier) -> Option<AlertAction> {
        if !to.is_severe() {
            if self.armed {
                debug!("Alert latch cleared on {}", to);
            }
            self.armed = false;
            return None;
        }

        if self.armed {
            return None;
        }

        self.armed = true;
        self.fired += 1;
        warn!("!!! OVERCROWDING ALERT !!! status {} (episode {})", to, self.fired);

        Some(AlertAction {
            tier: to,
            pattern: self.config.overcrowding_pattern,
            action_required: self.config.action_required.clone(),
        })
    }

    /// Whether the latch is currently set
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Alerts fired since start
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Pattern for a refused boarding
    pub fn entry_denied_pattern(&self) -> BeepPattern {
        self.config.entry_denied_pattern
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
