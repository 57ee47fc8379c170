//! Bus Occupancy Monitor - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppState, MonitorSettings};
use bus_controller::{
    BusController, LogBuzzer, LogDisplay, LogIndicators, Peripherals, SimulatedPanel,
    SimulatedVision, SleepingEffects, Tick,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use telemetry::TelemetryLog;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let settings = MonitorSettings::load(path.as_deref()).context("Failed to load settings")?;

    init_logging(&settings.log_level, settings.log_json);

    info!("=== Bus Occupancy Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Bus {} on route {} towards {} ({:?} profile)",
        settings.controller.bus.bus_id,
        settings.controller.bus.route,
        settings.controller.bus.heading,
        settings.profile
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let log = Arc::new(TelemetryLog::new(settings.telemetry_retention));
    let panel = Arc::new(SimulatedPanel::new(
        settings.panel.flow_rate,
        settings.panel.vision_accuracy,
    ));

    let config = settings.controller.clone();
    let peripherals = Peripherals {
        inputs: Box::new(Arc::clone(&panel)),
        analog: Box::new(Arc::clone(&panel)),
        vision: Box::new(SimulatedVision::new(&config.simulation)),
        display: Box::new(LogDisplay),
        indicators: Box::new(LogIndicators::default()),
        effects: Box::new(SleepingEffects::new(LogBuzzer)),
        telemetry: Box::new(Arc::clone(&log)),
    };
    let tick_interval = config.schedule.tick_interval();
    let mut controller = BusController::new(config, peripherals, Instant::now())?;

    let (snapshots, occupancy) = watch::channel(controller.snapshot(Utc::now()));
    let running = Arc::new(AtomicBool::new(true));

    // Blocking effects stall this thread only, never the API
    let control_loop = thread::Builder::new()
        .name("control-loop".to_string())
        .spawn({
            let running = Arc::clone(&running);
            move || {
                info!("Control loop started ({:?} tick)", tick_interval);
                while running.load(Ordering::Relaxed) {
                    controller.tick(Tick::now());
                    snapshots.send_replace(controller.snapshot(Utc::now()));
                    thread::sleep(tick_interval);
                }
                info!("Control loop stopped");
            }
        })
        .context("Failed to spawn control loop")?;

    let state = Arc::new(AppState::new(occupancy, log, metrics));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown requested");
    };

    let served = run_server(&settings.api_addr, state, shutdown).await;

    running.store(false, Ordering::Relaxed);
    if control_loop.join().is_err() {
        warn!("Control loop panicked");
    }

    served.context("API server failed")?;
    Ok(())
}
