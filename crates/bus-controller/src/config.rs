//! Controller configuration

use crate::simulation::SimulationConfig;
use crate::ControllerError;
use alerting::AlertConfig;
use occupancy_status::StatusConfig;
use passenger_counter::CounterConfig;
use sensor_fusion::FusionConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use stop_tracker::StopConfig;

/// Named preset bundling thresholds and policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// 50-seat bus, ratio bands, three-tier fusion, entry refused when full
    #[default]
    Demo,
    /// Absolute 50/80 bands, average-or-IR validation, no entry refusal
    Requirements,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Profile::Demo),
            "requirements" => Ok(Profile::Requirements),
            other => Err(format!("unknown profile '{}'", other)),
        }
    }
}

/// When the validated count follows the IR count between vision samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrPassthrough {
    /// Only while the fusion switch is off
    WhenFusionDisabled,
    /// On every counter change
    Always,
}

/// Identity of the monitored bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusProfile {
    pub bus_id: String,
    pub route: String,
    pub heading: String,
}

impl Default for BusProfile {
    fn default() -> Self {
        Self {
            bus_id: "BUS-138-CMB".to_string(),
            route: "138 Colombo-Nugegoda".to_string(),
            heading: "Nugegoda".to_string(),
        }
    }
}

/// Periodic task intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Automatic vision validation (seconds)
    pub camera_interval_secs: u64,
    /// Display and indicator refresh (milliseconds)
    pub display_interval_ms: u64,
    /// Simulated passenger flow step (seconds)
    pub simulation_interval_secs: u64,
    /// Telemetry upload (seconds)
    pub upload_interval_secs: u64,
    /// Control loop period (milliseconds)
    pub tick_interval_ms: u64,
    /// Blocking vision processing delay (milliseconds)
    pub capture_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            camera_interval_secs: 120,
            display_interval_ms: 1000,
            simulation_interval_secs: 5,
            upload_interval_secs: 30,
            tick_interval_ms: 10,
            capture_delay_ms: 500,
        }
    }
}

impl ScheduleConfig {
    pub fn camera_interval(&self) -> Duration {
        Duration::from_secs(self.camera_interval_secs)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn simulation_interval(&self) -> Duration {
        Duration::from_secs(self.simulation_interval_secs)
    }

    pub fn upload_interval(&self) -> Duration {
        Duration::from_secs(self.upload_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        let intervals = [
            ("camera_interval_secs", self.camera_interval_secs),
            ("display_interval_ms", self.display_interval_ms),
            ("simulation_interval_secs", self.simulation_interval_secs),
            ("upload_interval_secs", self.upload_interval_secs),
            ("tick_interval_ms", self.tick_interval_ms),
        ];
        match intervals.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ControllerError::Schedule(format!("{} must be positive", name))),
            None => Ok(()),
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub bus: BusProfile,
    pub counter: CounterConfig,
    pub fusion: FusionConfig,
    pub status: StatusConfig,
    pub stops: StopConfig,
    pub alerts: AlertConfig,
    pub schedule: ScheduleConfig,
    pub simulation: SimulationConfig,
    pub passthrough: IrPassthrough,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Demo)
    }
}

impl ControllerConfig {
    /// Preset configuration
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Demo => Self {
                bus: BusProfile::default(),
                counter: CounterConfig::demo(),
                fusion: FusionConfig::demo(),
                status: StatusConfig::demo(),
                stops: StopConfig::default(),
                alerts: AlertConfig::default(),
                schedule: ScheduleConfig::default(),
                simulation: SimulationConfig::demo(),
                passthrough: IrPassthrough::WhenFusionDisabled,
            },
            Profile::Requirements => Self {
                bus: BusProfile::default(),
                counter: CounterConfig::requirements(),
                fusion: FusionConfig::requirements(),
                status: StatusConfig::requirements(),
                stops: StopConfig::default(),
                alerts: AlertConfig::default(),
                schedule: ScheduleConfig::default(),
                simulation: SimulationConfig::requirements(),
                passthrough: IrPassthrough::Always,
            },
        }
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.counter.capacity == 0 {
            return Err(ControllerError::ZeroCapacity);
        }
        self.fusion.validate()?;
        self.status.validate()?;
        if self.stops.route.is_empty() {
            return Err(stop_tracker::StopError::EmptyRoute.into());
        }
        self.alerts.validate()?;
        self.schedule.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occupancy_status::BandingPolicy;
    use sensor_fusion::FusionPolicy;

    #[test]
    fn test_presets_are_valid() {
        for profile in [Profile::Demo, Profile::Requirements] {
            assert!(ControllerConfig::for_profile(profile).validate().is_ok());
        }
    }

    #[test]
    fn test_requirements_preset() {
        let config = ControllerConfig::for_profile(Profile::Requirements);
        assert_eq!(config.fusion.policy, FusionPolicy::AverageOrIr);
        assert_eq!(config.status.banding, BandingPolicy::Absolute);
        assert_eq!(config.passthrough, IrPassthrough::Always);
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!("Demo".parse::<Profile>(), Ok(Profile::Demo));
        assert_eq!(" requirements ".parse::<Profile>(), Ok(Profile::Requirements));
        assert!("fleet".parse::<Profile>().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ControllerConfig::default();
        config.schedule.upload_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ControllerError::Schedule(_))));

        let mut config = ControllerConfig::default();
        config.counter.capacity = 0;
        assert!(matches!(config.validate(), Err(ControllerError::ZeroCapacity)));
    }
}
