//! Monitor Settings
//!
//! Layered in order, later layers winning:
//! 1. Preset selected by `BUS_MONITOR_PROFILE` (`demo` | `requirements`)
//! 2. Optional TOML file
//! 3. `BUS_MONITOR_*` environment variables, `__` between nested keys
//!    (e.g. `BUS_MONITOR_CONTROLLER__COUNTER__CAPACITY=60`)

use bus_controller::{ControllerConfig, ControllerError, Profile};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BUS_MONITOR";

/// Environment variable choosing the preset
pub const PROFILE_ENV: &str = "BUS_MONITOR_PROFILE";

/// Settings file looked up when no path is given
pub const DEFAULT_SETTINGS_FILE: &str = "bus-monitor";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid profile: {0}")]
    Profile(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid controller settings: {0}")]
    Controller(#[from] ControllerError),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Initial positions of the simulated control panel knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Raw flow-rate reading, also the motion proxy
    pub flow_rate: i32,
    /// Raw vision accuracy reading
    pub vision_accuracy: i32,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            flow_rate: 2000,
            vision_accuracy: 4095,
        }
    }
}

/// Everything the binary needs to start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub profile: Profile,
    /// Status API listen address
    pub api_addr: String,
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Telemetry records kept in memory
    pub telemetry_retention: usize,
    pub panel: PanelSettings,
    pub controller: ControllerConfig,
}

impl MonitorSettings {
    /// Defaults for a preset
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            api_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            telemetry_retention: 1000,
            panel: PanelSettings::default(),
            controller: ControllerConfig::for_profile(profile),
        }
    }

    /// Load settings from preset, file, and environment
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let profile = match std::env::var(PROFILE_ENV) {
            Ok(raw) => raw.parse().map_err(SettingsError::Profile)?,
            Err(_) => Profile::default(),
        };
        debug!("Loading settings for {:?} profile", profile);

        let builder = Self::preset(profile)?
            .add_source(File::with_name(path.unwrap_or(DEFAULT_SETTINGS_FILE)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::finish(builder)
    }

    /// Builder seeded with the preset values
    fn preset(profile: Profile) -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        let defaults = Config::try_from(&Self::for_profile(profile))?;
        Ok(Config::builder().add_source(defaults))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check settings that deserialization alone cannot
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.api_addr
            .parse::<SocketAddr>()
            .map_err(|e| SettingsError::Invalid {
                field: "api_addr",
                reason: e.to_string(),
            })?;

        if self.telemetry_retention == 0 {
            return Err(SettingsError::Invalid {
                field: "telemetry_retention",
                reason: "must be positive".to_string(),
            });
        }

        self.controller.validate()?;
        Ok(())
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}
