//! Alerting System
//!
//! Fires one overcrowding alert per continuous dwell in the most severe
//! status tier, and describes the audible patterns the buzzer plays.

mod manager;
mod pattern;

pub use manager::{AlertAction, AlertConfig, AlertPolicy};
pub use pattern::{BeepPattern, PatternError};
