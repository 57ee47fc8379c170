//! Control loop

use crate::config::{ControllerConfig, IrPassthrough};
use crate::edge::EdgeDetector;
use crate::io::{
    clamp_analog, AnalogSource, BlockingEffect, DisplaySink, EffectRunner, IndicatorSink,
    InputSource, VisionRequest, VisionSource,
};
use crate::schedule::PeriodicTask;
use crate::simulation::{FlowEvent, FlowSimulator};
use crate::snapshot::{DisplaySnapshot, OccupancySnapshot};
use crate::ControllerError;
use alerting::{AlertAction, AlertPolicy};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use occupancy_status::{
    occupancy_percent, IndicatorState, OccupancyClassifier, StatusTier, Transition,
};
use passenger_counter::{CounterSnapshot, RawCounters};
use sensor_fusion::{FusionEngine, FusionInput, FusionOutcome, MismatchLevel};
use std::time::Instant;
use stop_tracker::{StopEvent, StopTracker};
use telemetry::{
    AlertRecord, LocationUpdate, TelemetryRecord, TelemetrySink, UploadPacket, ValidationPacket,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators the controller drives
pub struct Peripherals {
    pub inputs: Box<dyn InputSource + Send>,
    pub analog: Box<dyn AnalogSource + Send>,
    pub vision: Box<dyn VisionSource + Send>,
    pub display: Box<dyn DisplaySink + Send>,
    pub indicators: Box<dyn IndicatorSink + Send>,
    pub effects: Box<dyn EffectRunner + Send>,
    pub telemetry: Box<dyn TelemetrySink + Send>,
}

/// Loop time for one iteration
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Monotonic time driving schedules and dwell
    pub now: Instant,
    /// Wall clock stamped onto records
    pub wall: DateTime<Utc>,
}

impl Tick {
    pub fn now() -> Self {
        Self {
            now: Instant::now(),
            wall: Utc::now(),
        }
    }

    pub fn at(now: Instant, wall: DateTime<Utc>) -> Self {
        Self { now, wall }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub boardings: u32,
    pub alightings: u32,
    /// Manual boardings refused at capacity
    pub denied: u32,
    pub fusion: Option<FusionOutcome>,
    pub transitions: Vec<Transition>,
    pub uploaded: bool,
    pub display_refreshed: bool,
    pub stop_event: Option<StopEvent>,
    pub alert: Option<AlertRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowSource {
    Manual,
    Simulated,
}

impl FlowSource {
    fn label(self) -> &'static str {
        match self {
            FlowSource::Manual => "manual",
            FlowSource::Simulated => "simulated",
        }
    }
}

fn mismatch_label(level: MismatchLevel) -> &'static str {
    match level {
        MismatchLevel::None => "none",
        MismatchLevel::Minor => "minor",
        MismatchLevel::Major => "major",
    }
}

/// All occupancy state, owned by the loop
struct OccupancyState {
    counters: RawCounters,
    fusion: FusionEngine,
    classifier: OccupancyClassifier,
    stops: StopTracker,
    alerts: AlertPolicy,
    validated: u32,
    mismatch: MismatchLevel,
}

struct Timers {
    camera: PeriodicTask,
    upload: PeriodicTask,
    simulation: PeriodicTask,
    display: PeriodicTask,
}

/// Occupancy controller
pub struct BusController {
    config: ControllerConfig,
    state: OccupancyState,
    io: Peripherals,
    flow: FlowSimulator,
    timers: Timers,
    entry_edge: EdgeDetector,
    exit_edge: EdgeDetector,
    vision_edge: EdgeDetector,
}

impl BusController {
    /// Build a controller whose schedules start at `start`
    pub fn new(
        config: ControllerConfig,
        io: Peripherals,
        start: Instant,
    ) -> Result<Self, ControllerError> {
        config.validate()?;

        let capacity = config.counter.capacity;
        let state = OccupancyState {
            counters: RawCounters::new(config.counter.clone()),
            fusion: FusionEngine::new(config.fusion.clone(), capacity)?,
            classifier: OccupancyClassifier::new(config.status.clone(), capacity)?,
            stops: StopTracker::new(config.stops.clone(), start)?,
            alerts: AlertPolicy::new(config.alerts.clone()),
            validated: 0,
            mismatch: MismatchLevel::None,
        };

        let schedule = &config.schedule;
        let timers = Timers {
            camera: PeriodicTask::new("camera", schedule.camera_interval(), start),
            upload: PeriodicTask::new("upload", schedule.upload_interval(), start),
            simulation: PeriodicTask::new("simulation", schedule.simulation_interval(), start),
            display: PeriodicTask::new("display", schedule.display_interval(), start),
        };

        info!(
            "Controller ready for {} ({}), capacity {}, {:?} fusion, {:?} banding",
            config.bus.bus_id,
            config.bus.route,
            capacity,
            config.fusion.policy,
            config.status.banding
        );
        for task in [&timers.camera, &timers.upload, &timers.simulation, &timers.display] {
            debug!("Scheduled {} every {:?}", task.name(), task.interval());
        }

        Ok(Self {
            flow: FlowSimulator::new(&config.simulation),
            config,
            state,
            io,
            timers,
            entry_edge: EdgeDetector::new(),
            exit_edge: EdgeDetector::new(),
            vision_edge: EdgeDetector::new(),
        })
    }

    /// Run one loop iteration
    pub fn tick(&mut self, tick: Tick) -> TickReport {
        let mut report = TickReport::default();
        let levels = self.io.inputs.levels();

        if self.entry_edge.pressed(levels.entry) {
            self.handle_boarding(FlowSource::Manual, levels.fusion_enabled, &mut report);
        }
        if self.exit_edge.pressed(levels.exit) {
            self.handle_alighting(FlowSource::Manual, levels.fusion_enabled, &mut report);
        }

        if self.vision_edge.pressed(levels.vision_trigger) {
            info!("[MANUAL] Vision validation triggered");
            self.run_validation(levels.fusion_enabled, tick, &mut report);
            self.timers.camera.mark_run(tick.now);
        }
        if self.timers.camera.poll(tick.now) {
            info!("[AUTO] Scheduled vision validation");
            self.run_validation(levels.fusion_enabled, tick, &mut report);
        }

        if self.timers.upload.poll(tick.now) {
            let packet = self.upload_packet(tick.wall);
            self.emit(TelemetryRecord::Upload(packet));
            report.uploaded = true;
        }

        if self.timers.simulation.poll(tick.now) && self.config.simulation.enabled {
            let flow = clamp_analog(self.io.analog.flow_rate());
            match self.flow.step(flow) {
                Some(FlowEvent::Boarding) => {
                    self.handle_boarding(FlowSource::Simulated, levels.fusion_enabled, &mut report)
                }
                Some(FlowEvent::Alighting) => {
                    self.handle_alighting(FlowSource::Simulated, levels.fusion_enabled, &mut report)
                }
                None => {}
            }
        }

        if self.timers.display.poll(tick.now) {
            let snapshot = self.display_snapshot();
            self.io.display.render(&snapshot);
            let leds = self.indicator_state();
            self.io.indicators.apply(leds);
            report.display_refreshed = true;
        }

        let motion = clamp_analog(self.io.analog.flow_rate());
        if let Some(event) = self.state.stops.sample(motion, tick.now) {
            if let StopEvent::Arrived(arrival) = &event {
                let update = LocationUpdate {
                    timestamp: tick.wall,
                    bus_id: self.config.bus.bus_id.clone(),
                    lat: arrival.stop.lat,
                    lon: arrival.stop.lon,
                    stop_name: arrival.stop.name.clone(),
                    passenger_count: self.state.validated,
                };
                self.emit(TelemetryRecord::Location(update));
            }
            report.stop_event = Some(event);
        }

        let status = self.state.classifier.current();
        if let Some(action) = self.state.alerts.on_status_transition(status) {
            let record = self.alert_record(&action, tick.wall);
            counter!("bus_alerts_total").increment(1);
            self.emit(TelemetryRecord::Alert(record.clone()));
            self.io.effects.perform(BlockingEffect::Beep(action.pattern));
            report.alert = Some(record);
        }

        report
    }

    fn handle_boarding(
        &mut self,
        source: FlowSource,
        fusion_enabled: bool,
        report: &mut TickReport,
    ) {
        match self.state.counters.record_boarding() {
            Ok(count) => {
                self.state.stops.record_leg_boarding();
                report.boardings += 1;
                counter!("bus_boardings_total", "source" => source.label()).increment(1);
                info!(
                    "[{}] ENTRY at {} | ir count {} | occupancy {:.1}%",
                    source.label(),
                    self.state.stops.current_stop(),
                    count,
                    occupancy_percent(count, self.state.counters.capacity())
                );
                self.follow_ir(fusion_enabled, report);
            }
            Err(err) if source == FlowSource::Manual => {
                warn!("{}", err);
                counter!("bus_boardings_denied_total").increment(1);
                report.denied += 1;
                let pattern = self.state.alerts.entry_denied_pattern();
                self.io.effects.perform(BlockingEffect::Beep(pattern));
            }
            Err(err) => debug!("Simulated boarding dropped: {}", err),
        }
    }

    fn handle_alighting(
        &mut self,
        source: FlowSource,
        fusion_enabled: bool,
        report: &mut TickReport,
    ) {
        if !self.state.counters.record_alighting() {
            return;
        }

        self.state.stops.record_leg_alighting();
        report.alightings += 1;
        counter!("bus_alightings_total", "source" => source.label()).increment(1);
        let count = self.state.counters.ir_count();
        info!(
            "[{}] EXIT at {} | ir count {} | occupancy {:.1}%",
            source.label(),
            self.state.stops.current_stop(),
            count,
            occupancy_percent(count, self.state.counters.capacity())
        );
        self.follow_ir(fusion_enabled, report);
    }

    /// Let the validated count track IR between vision samples
    fn follow_ir(&mut self, fusion_enabled: bool, report: &mut TickReport) {
        let follow = match self.config.passthrough {
            IrPassthrough::Always => true,
            IrPassthrough::WhenFusionDisabled => !fusion_enabled,
        };
        if follow {
            let counters = &self.state.counters;
            self.state.validated = counters.ir_count().min(counters.capacity());
            self.update_status(report);
        }
    }

    fn run_validation(&mut self, fusion_enabled: bool, tick: Tick, report: &mut TickReport) {
        // Vision processing holds the loop
        let delay = self.config.schedule.capture_delay();
        self.io.effects.perform(BlockingEffect::VisionCapture(delay));

        let counters = &self.state.counters;
        let request = VisionRequest {
            ir_count: counters.ir_count(),
            capacity: counters.capacity(),
            ceiling: counters.config().vision_ceiling(),
            accuracy: clamp_analog(self.io.analog.vision_accuracy()),
        };
        let sample = self.io.vision.capture(request);
        self.state.counters.submit_vision_sample(sample);

        let ir = self.state.counters.ir_count();
        let camera = self.state.counters.camera_count();
        let outcome = self.state.fusion.fuse(FusionInput {
            ir,
            camera,
            fusion_enabled,
            prior_validated: self.state.validated,
        });

        if !fusion_enabled {
            info!("Sensor fusion disabled, using IR count");
        }
        info!(
            "Vision count {} | IR count {} | validated {} ({}%, mismatch {:?})",
            camera,
            ir,
            outcome.validated,
            occupancy_percent(outcome.validated, self.state.counters.capacity()).round(),
            outcome.mismatch
        );
        counter!("bus_fusion_passes_total", "mismatch" => mismatch_label(outcome.mismatch))
            .increment(1);

        self.state.validated = outcome.validated;
        self.state.mismatch = outcome.mismatch;

        let packet = ValidationPacket {
            bus_id: self.config.bus.bus_id.clone(),
            ir_count: ir,
            camera_count: camera,
            validated: outcome.validated,
            validation_passed: outcome.validation_passed(),
            mismatch: outcome.mismatch,
            timestamp: tick.wall,
        };
        self.emit(TelemetryRecord::Validation(packet));

        report.fusion = Some(outcome);
        self.update_status(report);
        // Mismatch LED latches per pass even when the tier holds
        let leds = self.indicator_state();
        self.io.indicators.apply(leds);
    }

    fn update_status(&mut self, report: &mut TickReport) {
        gauge!("bus_validated_count").set(f64::from(self.state.validated));
        if let Some(transition) = self.state.classifier.observe(self.state.validated) {
            report.transitions.push(transition);
            let leds = self.indicator_state();
            self.io.indicators.apply(leds);
        }
    }

    fn emit(&mut self, record: TelemetryRecord) {
        let kind = record.kind();
        if let Err(e) = self.io.telemetry.emit(record) {
            warn!("Failed to emit {} record: {}", kind, e);
        }
    }

    fn upload_packet(&self, wall: DateTime<Utc>) -> UploadPacket {
        let (lat, lon) = self.state.stops.position();
        UploadPacket {
            timestamp: wall,
            bus_id: self.config.bus.bus_id.clone(),
            passenger_count: self.state.validated,
            ir_count: self.state.counters.ir_count(),
            lat,
            lon,
            status: self.state.classifier.current(),
        }
    }

    fn alert_record(&self, action: &AlertAction, wall: DateTime<Utc>) -> AlertRecord {
        let (lat, lon) = self.state.stops.position();
        AlertRecord {
            id: Uuid::new_v4(),
            alert_type: action.tier,
            bus_id: self.config.bus.bus_id.clone(),
            passenger_count: self.state.validated,
            occupancy_percent: occupancy_percent(
                self.state.validated,
                self.state.counters.capacity(),
            ),
            location: self.state.stops.current_stop().to_string(),
            lat,
            lon,
            timestamp: wall,
            action_required: action.action_required.clone(),
        }
    }

    /// What the display shows right now
    pub fn display_snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            validated: self.state.validated,
            capacity: self.state.counters.capacity(),
            status: self.state.classifier.current(),
            location_label: self.state.stops.current_stop().to_string(),
            at_stop: self.state.stops.at_stop(),
            daily_passengers: self.state.counters.daily_passengers(),
        }
    }

    /// LED states for the current status
    pub fn indicator_state(&self) -> IndicatorState {
        IndicatorState::for_tier(
            self.state.classifier.current(),
            self.state.mismatch != MismatchLevel::None,
        )
    }

    /// Full state copy for outside readers
    pub fn snapshot(&self, wall: DateTime<Utc>) -> OccupancySnapshot {
        let (lat, lon) = self.state.stops.position();
        let capacity = self.state.counters.capacity();
        OccupancySnapshot {
            bus_id: self.config.bus.bus_id.clone(),
            route: self.config.bus.route.clone(),
            timestamp: wall,
            validated: self.state.validated,
            capacity,
            occupancy_percent: occupancy_percent(self.state.validated, capacity),
            status: self.state.classifier.current(),
            ir_count: self.state.counters.ir_count(),
            camera_count: self.state.counters.camera_count(),
            mismatch: self.state.mismatch,
            current_stop: self.state.stops.current_stop().to_string(),
            next_stop: self.state.stops.next_stop().to_string(),
            at_stop: self.state.stops.at_stop(),
            lat,
            lon,
            daily_passengers: self.state.counters.daily_passengers(),
            leg: self.state.stops.leg(),
            alerts_fired: self.state.alerts.fired(),
        }
    }

    pub fn validated(&self) -> u32 {
        self.state.validated
    }

    pub fn status(&self) -> StatusTier {
        self.state.classifier.current()
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.state.counters.snapshot()
    }

    pub fn stops(&self) -> &StopTracker {
        &self.state.stops
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
