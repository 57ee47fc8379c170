//! Sensor Fusion Engine
//!
//! Reconciles two disagreeing passenger counts into one validated value:
//! - IR count (entry/exit beams, drifts with missed or doubled edges)
//! - Vision count (periodic camera estimate, noisy but absolute)
//!
//! The reconciliation weight depends on how far the two channels disagree.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Fusion configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Camera weight {name} = {value} is outside [0, 1]")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("Escalation threshold {escalation} is below agreement threshold {agreement}")]
    ThresholdOrder { agreement: u32, escalation: u32 },
}

/// How far the two channels disagreed on a fusion pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchLevel {
    None,
    Minor,
    Major,
}

/// Reconciliation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Agree / moderate / large mismatch tiers with load-dependent trust
    Tiered,
    /// Average on agreement, otherwise keep the IR count
    AverageOrIr,
}

/// Fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub policy: FusionPolicy,
    /// Largest difference still treated as agreement
    pub agreement_threshold: u32,
    /// Largest difference treated as a moderate mismatch (tiered only)
    pub escalation_threshold: u32,
    /// Camera weight when the sensors agree
    pub agreement_camera_weight: f64,
    /// Camera weight on a moderate mismatch
    pub moderate_camera_weight: f64,
    /// Camera weight on a moderate mismatch once IR is saturating
    pub saturated_camera_weight: f64,
    /// IR count above which the IR channel is considered saturating
    pub saturation_ir_threshold: u32,
    /// IR count above which a large mismatch trusts the camera
    pub high_load_ir_threshold: u32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl FusionConfig {
    /// Three-tier weighting used on the demonstration bus
    pub fn demo() -> Self {
        Self {
            policy: FusionPolicy::Tiered,
            agreement_threshold: 2,
            escalation_threshold: 5,
            agreement_camera_weight: 0.7,
            moderate_camera_weight: 0.6,
            saturated_camera_weight: 0.8,
            saturation_ir_threshold: 40,
            high_load_ir_threshold: 30,
        }
    }

    /// Average-or-IR validation from the requirements profile
    pub fn requirements() -> Self {
        Self {
            policy: FusionPolicy::AverageOrIr,
            agreement_threshold: 3,
            escalation_threshold: 3,
            agreement_camera_weight: 0.5,
            ..Self::demo()
        }
    }

    /// Check weights and threshold ordering
    pub fn validate(&self) -> Result<(), FusionError> {
        let weights = [
            ("agreement_camera_weight", self.agreement_camera_weight),
            ("moderate_camera_weight", self.moderate_camera_weight),
            ("saturated_camera_weight", self.saturated_camera_weight),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(FusionError::InvalidWeight { name, value });
            }
        }

        if self.policy == FusionPolicy::Tiered
            && self.escalation_threshold < self.agreement_threshold
        {
            return Err(FusionError::ThresholdOrder {
                agreement: self.agreement_threshold,
                escalation: self.escalation_threshold,
            });
        }

        Ok(())
    }
}

/// Inputs to one fusion pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionInput {
    pub ir: u32,
    pub camera: u32,
    pub fusion_enabled: bool,
    pub prior_validated: u32,
}

/// Result of one fusion pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionOutcome {
    /// Validated occupancy, always within `[0, capacity]`
    pub validated: u32,
    pub mismatch: MismatchLevel,
    /// `|camera - ir|`, zero when fusion is disabled
    pub difference: u32,
    /// Change against the prior validated count
    pub delta: i64,
}

impl FusionOutcome {
    /// Whether the vision sample confirmed the IR channel
    pub fn validation_passed(&self) -> bool {
        self.mismatch == MismatchLevel::None
    }
}

/// Fusion engine
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
    capacity: u32,
}

impl FusionEngine {
    /// Create a fusion engine clamping to `capacity`
    pub fn new(config: FusionConfig, capacity: u32) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self { config, capacity })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Reconcile the two counts
    ///
    /// Pure in its inputs: repeated calls with the same input return the
    /// same outcome.
    pub fn fuse(&self, input: FusionInput) -> FusionOutcome {
        let (raw, mismatch, difference) = if !input.fusion_enabled {
            (i64::from(input.ir), MismatchLevel::None, 0)
        } else {
            let difference = input.camera.abs_diff(input.ir);
            let (raw, mismatch) = match self.config.policy {
                FusionPolicy::Tiered => self.fuse_tiered(input.ir, input.camera, difference),
                FusionPolicy::AverageOrIr => {
                    self.fuse_average_or_ir(input.ir, input.camera, difference)
                }
            };
            (raw, mismatch, difference)
        };

        let validated = raw.clamp(0, i64::from(self.capacity)) as u32;
        let delta = i64::from(validated) - i64::from(input.prior_validated);

        debug!(
            "Fusion ir={} camera={} diff={} -> {} ({:?}, delta {})",
            input.ir, input.camera, difference, validated, mismatch, delta
        );

        FusionOutcome {
            validated,
            mismatch,
            difference,
            delta,
        }
    }

    fn fuse_tiered(&self, ir: u32, camera: u32, difference: u32) -> (i64, MismatchLevel) {
        let cfg = &self.config;

        if difference <= cfg.agreement_threshold {
            return (
                weighted(cfg.agreement_camera_weight, camera, ir),
                MismatchLevel::None,
            );
        }

        if difference <= cfg.escalation_threshold {
            let weight = if ir > cfg.saturation_ir_threshold {
                cfg.saturated_camera_weight
            } else {
                cfg.moderate_camera_weight
            };
            return (weighted(weight, camera, ir), MismatchLevel::Minor);
        }

        // Large disagreement: pick one channel outright
        let trusted = if ir > cfg.high_load_ir_threshold { camera } else { ir };
        (i64::from(trusted), MismatchLevel::Major)
    }

    fn fuse_average_or_ir(&self, ir: u32, camera: u32, difference: u32) -> (i64, MismatchLevel) {
        if difference <= self.config.agreement_threshold {
            (
                weighted(self.config.agreement_camera_weight, camera, ir),
                MismatchLevel::None,
            )
        } else {
            (i64::from(ir), MismatchLevel::Major)
        }
    }
}

/// `round(w * camera + (1 - w) * ir)`, halves rounded away from zero
fn weighted(camera_weight: f64, camera: u32, ir: u32) -> i64 {
    let blended = camera_weight * f64::from(camera) + (1.0 - camera_weight) * f64::from(ir);
    blended.round() as i64
}
