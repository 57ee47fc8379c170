//! Route handlers

pub mod alerts;
pub mod metrics;
pub mod occupancy;
pub mod telemetry;
