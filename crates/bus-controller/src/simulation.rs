//! Simulated collaborators
//!
//! Stand-ins for the passenger flow, camera, and control panel so the loop
//! can run without hardware.

use crate::io::{
    map_range, AnalogSource, InputLevels, InputSource, VisionRequest, VisionSource, ANALOG_MAX,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

/// How simulated vision counts deviate from the IR count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionModel {
    /// Spread scales with the accuracy setting and crowding
    OccupancyScaled,
    /// Uniform deviation of at most `uniform_spread`
    Uniform,
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Inject simulated passenger flow
    pub enabled: bool,
    /// Fixed RNG seed, entropy when absent
    pub seed: Option<u64>,
    /// Flow readings at or below this inject no passengers
    pub flow_activation: i32,
    /// Share of simulated events that are boardings (percent)
    pub boarding_percent: u32,
    pub vision_model: VisionModel,
    pub uniform_spread: i32,
}

impl SimulationConfig {
    pub fn demo() -> Self {
        Self {
            enabled: true,
            seed: None,
            flow_activation: 500,
            boarding_percent: 70,
            vision_model: VisionModel::OccupancyScaled,
            uniform_spread: 2,
        }
    }

    pub fn requirements() -> Self {
        Self {
            vision_model: VisionModel::Uniform,
            ..Self::demo()
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::demo()
    }
}

/// `random(lo, hi)` over `[lo, hi)`, returning `lo` for an empty range
fn random_between(rng: &mut StdRng, lo: i64, hi: i64) -> i64 {
    if lo >= hi {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}

/// Simulated passenger event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    Boarding,
    Alighting,
}

/// Injects random boardings and alightings scaled by the flow reading
pub struct FlowSimulator {
    activation: i32,
    boarding_percent: u32,
    rng: StdRng,
}

impl FlowSimulator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            activation: config.flow_activation,
            boarding_percent: config.boarding_percent.min(100),
            rng: config.rng(),
        }
    }

    /// One simulation step for a clamped flow reading
    pub fn step(&mut self, flow: u32) -> Option<FlowEvent> {
        let flow = i64::from(flow);
        let activation = i64::from(self.activation);
        if flow <= activation {
            return None;
        }

        let probability = map_range(flow, activation, i64::from(ANALOG_MAX), 0, 100);
        if self.rng.gen_range(0..100) >= probability {
            return None;
        }

        if self.rng.gen_range(0..100) < self.boarding_percent {
            Some(FlowEvent::Boarding)
        } else {
            Some(FlowEvent::Alighting)
        }
    }
}

/// Camera stand-in deriving a count from the IR count plus noise
pub struct SimulatedVision {
    model: VisionModel,
    spread: i64,
    rng: StdRng,
}

impl SimulatedVision {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            model: config.vision_model,
            spread: i64::from(config.uniform_spread.max(0)),
            rng: config.rng(),
        }
    }

    fn variation(&mut self, request: &VisionRequest) -> i64 {
        match self.model {
            VisionModel::Uniform => random_between(&mut self.rng, -self.spread, self.spread + 1),
            VisionModel::OccupancyScaled => {
                let accuracy =
                    map_range(i64::from(request.accuracy), 0, i64::from(ANALOG_MAX), 50, 99);
                let max_variation = map_range(accuracy, 50, 99, 5, 1);
                let ratio = if request.capacity == 0 {
                    0.0
                } else {
                    f64::from(request.ir_count) / f64::from(request.capacity)
                };

                if ratio > 0.8 {
                    // Crowded: camera tends to see more
                    random_between(&mut self.rng, -1, max_variation + 2)
                } else if ratio > 0.5 {
                    random_between(&mut self.rng, -max_variation / 2, max_variation)
                } else {
                    random_between(&mut self.rng, 0, max_variation / 2 + 1)
                }
            }
        }
    }
}

impl VisionSource for SimulatedVision {
    fn capture(&mut self, request: VisionRequest) -> u32 {
        let variation = self.variation(&request);
        (i64::from(request.ir_count) + variation).clamp(0, i64::from(request.ceiling)) as u32
    }
}

/// Control panel with momentary buttons, a fusion switch, and two knobs
///
/// Shared between the control loop and whatever drives it.
#[derive(Debug)]
pub struct SimulatedPanel {
    entry: AtomicBool,
    exit: AtomicBool,
    vision_trigger: AtomicBool,
    fusion_enabled: AtomicBool,
    flow_rate: AtomicI32,
    vision_accuracy: AtomicI32,
}

impl SimulatedPanel {
    pub fn new(flow_rate: i32, vision_accuracy: i32) -> Self {
        Self {
            entry: AtomicBool::new(false),
            exit: AtomicBool::new(false),
            vision_trigger: AtomicBool::new(false),
            fusion_enabled: AtomicBool::new(true),
            flow_rate: AtomicI32::new(flow_rate),
            vision_accuracy: AtomicI32::new(vision_accuracy),
        }
    }

    /// Press the entry button for one sample
    pub fn press_entry(&self) {
        self.entry.store(true, Ordering::Relaxed);
    }

    /// Press the exit button for one sample
    pub fn press_exit(&self) {
        self.exit.store(true, Ordering::Relaxed);
    }

    /// Press the vision trigger for one sample
    pub fn press_vision_trigger(&self) {
        self.vision_trigger.store(true, Ordering::Relaxed);
    }

    pub fn set_fusion_enabled(&self, enabled: bool) {
        self.fusion_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_flow_rate(&self, raw: i32) {
        self.flow_rate.store(raw, Ordering::Relaxed);
    }
}

impl Default for SimulatedPanel {
    fn default() -> Self {
        Self::new(0, ANALOG_MAX)
    }
}

impl InputSource for Arc<SimulatedPanel> {
    fn levels(&mut self) -> InputLevels {
        // Momentary buttons read pressed once, then spring back
        InputLevels {
            entry: self.entry.swap(false, Ordering::Relaxed),
            exit: self.exit.swap(false, Ordering::Relaxed),
            vision_trigger: self.vision_trigger.swap(false, Ordering::Relaxed),
            fusion_enabled: self.fusion_enabled.load(Ordering::Relaxed),
        }
    }
}

impl AnalogSource for Arc<SimulatedPanel> {
    fn flow_rate(&mut self) -> i32 {
        self.flow_rate.load(Ordering::Relaxed)
    }

    fn vision_accuracy(&mut self) -> i32 {
        self.vision_accuracy.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::clamp_analog;

    fn seeded(model: VisionModel) -> SimulationConfig {
        SimulationConfig {
            seed: Some(7),
            vision_model: model,
            ..SimulationConfig::demo()
        }
    }

    #[test]
    fn test_low_flow_injects_nothing() {
        let mut sim = FlowSimulator::new(&seeded(VisionModel::OccupancyScaled));
        for _ in 0..200 {
            assert_eq!(sim.step(500), None);
        }
    }

    #[test]
    fn test_full_flow_mostly_boards() {
        let mut sim = FlowSimulator::new(&seeded(VisionModel::OccupancyScaled));
        let events: Vec<_> = (0..1000).filter_map(|_| sim.step(clamp_analog(4095))).collect();

        // Probability is 100% at full scale
        assert_eq!(events.len(), 1000);
        let boardings = events.iter().filter(|e| **e == FlowEvent::Boarding).count();
        assert!(boardings > 600 && boardings < 800, "boardings {boardings}");
    }

    #[test]
    fn test_uniform_vision_within_spread() {
        let mut vision = SimulatedVision::new(&seeded(VisionModel::Uniform));
        for _ in 0..500 {
            let count = vision.capture(VisionRequest {
                ir_count: 60,
                capacity: 100,
                ceiling: 100,
                accuracy: 2000,
            });
            assert!((58..=62).contains(&count), "count {count}");
        }
    }

    #[test]
    fn test_scaled_vision_light_load_never_undercounts() {
        let mut vision = SimulatedVision::new(&seeded(VisionModel::OccupancyScaled));
        for _ in 0..500 {
            let count = vision.capture(VisionRequest {
                ir_count: 10,
                capacity: 50,
                ceiling: 53,
                accuracy: 0,
            });
            // Lowest accuracy: max variation 5, light load draws from [0, 3)
            assert!((10..=12).contains(&count), "count {count}");
        }
    }

    #[test]
    fn test_vision_respects_ceiling() {
        let mut vision = SimulatedVision::new(&seeded(VisionModel::OccupancyScaled));
        for _ in 0..500 {
            let count = vision.capture(VisionRequest {
                ir_count: 50,
                capacity: 50,
                ceiling: 53,
                accuracy: 0,
            });
            assert!(count <= 53);
        }
    }

    #[test]
    fn test_panel_buttons_are_momentary() {
        let mut panel = Arc::new(SimulatedPanel::default());
        panel.press_entry();
        assert!(panel.levels().entry);
        assert!(!panel.levels().entry);

        panel.set_fusion_enabled(false);
        assert!(!panel.levels().fusion_enabled);

        panel.set_flow_rate(-5);
        assert_eq!(clamp_analog(panel.flow_rate()), 0);
    }
}
