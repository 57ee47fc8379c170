//! Bus Occupancy Controller
//!
//! One cooperative control loop owns every piece of occupancy state. Each
//! tick runs, in order:
//! 1. Counter input edges (entry / exit buttons)
//! 2. Vision validation (manual trigger or camera interval)
//! 3. Telemetry upload
//! 4. Simulated passenger flow
//! 5. Display and indicator refresh
//! 6. Stop detection
//! 7. Overcrowding alert check
//!
//! Later stages read state written by earlier ones within the same tick.

pub mod config;
pub mod controller;
pub mod edge;
pub mod io;
pub mod schedule;
pub mod simulation;
pub mod snapshot;

pub use config::{BusProfile, ControllerConfig, IrPassthrough, Profile, ScheduleConfig};
pub use controller::{BusController, Peripherals, Tick, TickReport};
pub use io::{
    AnalogSource, BlockingEffect, Buzzer, DisplaySink, EffectRunner, IndicatorSink, InputLevels,
    InputSource, LogBuzzer, LogDisplay, LogIndicators, SleepingEffects, VisionRequest,
    VisionSource,
};
pub use simulation::{
    FlowEvent, FlowSimulator, SimulatedPanel, SimulatedVision, SimulationConfig, VisionModel,
};
pub use snapshot::{DisplaySnapshot, OccupancySnapshot};

use thiserror::Error;

/// Controller construction errors
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Capacity must be positive")]
    ZeroCapacity,

    #[error("Fusion configuration: {0}")]
    Fusion(#[from] sensor_fusion::FusionError),

    #[error("Status configuration: {0}")]
    Status(#[from] occupancy_status::StatusError),

    #[error("Stop configuration: {0}")]
    Stops(#[from] stop_tracker::StopError),

    #[error("Alert configuration: {0}")]
    Alert(#[from] alerting::PatternError),

    #[error("Schedule configuration: {0}")]
    Schedule(String),
}
