//! Collaborator contracts
//!
//! The controller samples inputs and pushes outputs through these traits.
//! Hardware drivers, display rendering, and buzzer wiring live behind them.

use crate::snapshot::DisplaySnapshot;
use alerting::BeepPattern;
use occupancy_status::{IndicatorState, StatusTier};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Full-scale reading of the analog proxies
pub const ANALOG_MAX: i32 = 4095;

/// Clamp a raw analog reading into `0..=ANALOG_MAX`
pub fn clamp_analog(raw: i32) -> u32 {
    raw.clamp(0, ANALOG_MAX) as u32
}

/// Linear integer re-mapping between ranges, truncating toward zero
pub fn map_range(value: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    if in_max == in_min {
        return out_min;
    }
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Digital input levels sampled once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLevels {
    pub entry: bool,
    pub exit: bool,
    pub vision_trigger: bool,
    pub fusion_enabled: bool,
}

impl Default for InputLevels {
    fn default() -> Self {
        Self {
            entry: false,
            exit: false,
            vision_trigger: false,
            fusion_enabled: true,
        }
    }
}

/// Button and switch levels
pub trait InputSource {
    fn levels(&mut self) -> InputLevels;
}

/// Analog proxy readings, raw sensor units
pub trait AnalogSource {
    /// Flow rate, also used as the motion proxy
    fn flow_rate(&mut self) -> i32;
    /// Vision accuracy setting
    fn vision_accuracy(&mut self) -> i32;
}

/// What a vision capture knows about the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionRequest {
    pub ir_count: u32,
    pub capacity: u32,
    /// Highest count the capture may report
    pub ceiling: u32,
    /// Accuracy reading, already clamped
    pub accuracy: u32,
}

/// Camera-based passenger counter
pub trait VisionSource {
    fn capture(&mut self, request: VisionRequest) -> u32;
}

/// Renders the occupancy display
pub trait DisplaySink {
    fn render(&mut self, snapshot: &DisplaySnapshot);
}

/// Drives the status and mismatch LEDs
pub trait IndicatorSink {
    fn apply(&mut self, state: IndicatorState);
}

/// Buzzer output
pub trait Buzzer {
    fn set(&mut self, on: bool);
}

/// Effects that hold the control loop for their whole duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingEffect {
    /// Play a buzzer pattern
    Beep(BeepPattern),
    /// Wait out vision processing
    VisionCapture(Duration),
}

impl BlockingEffect {
    pub fn duration(&self) -> Duration {
        match self {
            BlockingEffect::Beep(pattern) => pattern.duration(),
            BlockingEffect::VisionCapture(delay) => *delay,
        }
    }
}

/// Executes blocking effects
///
/// Implementations decide whether the loop really stalls; edge detection
/// does not run while `perform` is executing either way.
pub trait EffectRunner {
    fn perform(&mut self, effect: BlockingEffect);
}

/// Runs effects synchronously with `thread::sleep`, stalling the loop
pub struct SleepingEffects<B: Buzzer> {
    buzzer: B,
}

impl<B: Buzzer> SleepingEffects<B> {
    pub fn new(buzzer: B) -> Self {
        Self { buzzer }
    }
}

impl<B: Buzzer> EffectRunner for SleepingEffects<B> {
    fn perform(&mut self, effect: BlockingEffect) {
        debug!("Blocking for {:?}: {:?}", effect.duration(), effect);
        match effect {
            BlockingEffect::Beep(pattern) => {
                for (on, hold) in pattern.steps() {
                    self.buzzer.set(on);
                    thread::sleep(hold);
                }
                self.buzzer.set(false);
            }
            BlockingEffect::VisionCapture(delay) => thread::sleep(delay),
        }
    }
}

/// Buzzer that only logs
#[derive(Debug, Default)]
pub struct LogBuzzer;

impl Buzzer for LogBuzzer {
    fn set(&mut self, on: bool) {
        debug!(target: "buzzer", "buzzer {}", if on { "on" } else { "off" });
    }
}

/// Display that logs the two 16-character lines it would show
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        let badge = badge(snapshot.status);
        let second = if snapshot.at_stop {
            format!("At: {}", truncate(&snapshot.location_label, 12))
        } else {
            format!("Today: {} pass", snapshot.daily_passengers)
        };
        debug!(
            target: "display",
            "Pass:{}/{} {} | {}",
            snapshot.validated, snapshot.capacity, badge, second
        );
    }
}

/// Short status badge for the first display line
fn badge(status: StatusTier) -> &'static str {
    match status {
        StatusTier::Undercrowded => "LOW",
        StatusTier::Normal | StatusTier::Green => "OK",
        StatusTier::NearlyFull | StatusTier::Yellow => "NEAR",
        StatusTier::Overcrowded | StatusTier::Red => "FULL!",
    }
}

fn truncate(label: &str, max_chars: usize) -> &str {
    match label.char_indices().nth(max_chars) {
        Some((idx, _)) => &label[..idx],
        None => label,
    }
}

/// Indicator sink that logs LED changes
#[derive(Debug, Default)]
pub struct LogIndicators {
    last: Option<IndicatorState>,
}

impl IndicatorSink for LogIndicators {
    fn apply(&mut self, state: IndicatorState) {
        if self.last != Some(state) {
            debug!(target: "indicators", "LEDs {:?}", state);
            self.last = Some(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBuzzer {
        transitions: Vec<bool>,
    }

    impl Buzzer for &mut CountingBuzzer {
        fn set(&mut self, on: bool) {
            self.transitions.push(on);
        }
    }

    #[test]
    fn test_clamp_analog() {
        assert_eq!(clamp_analog(-20), 0);
        assert_eq!(clamp_analog(2048), 2048);
        assert_eq!(clamp_analog(9000), 4095);
    }

    #[test]
    fn test_map_range() {
        assert_eq!(map_range(500, 500, 4095, 0, 100), 0);
        assert_eq!(map_range(4095, 500, 4095, 0, 100), 100);
        assert_eq!(map_range(2297, 500, 4095, 0, 100), 49);
        // Inverted output range
        assert_eq!(map_range(50, 50, 99, 5, 1), 5);
        assert_eq!(map_range(99, 50, 99, 5, 1), 1);
        assert_eq!(map_range(3, 3, 3, 7, 9), 7);
    }

    #[test]
    fn test_sleeping_effects_plays_pattern() {
        let mut buzzer = CountingBuzzer::default();
        {
            let mut effects = SleepingEffects::new(&mut buzzer);
            effects.perform(BlockingEffect::Beep(BeepPattern {
                pulses: 2,
                on_ms: 1,
                off_ms: 1,
            }));
        }
        assert_eq!(buzzer.transitions, vec![true, false, true, false, false]);
    }

    #[test]
    fn test_effect_duration() {
        let beep = BlockingEffect::Beep(BeepPattern::overcrowding());
        assert_eq!(beep.duration(), Duration::from_millis(600));
        let capture = BlockingEffect::VisionCapture(Duration::from_millis(500));
        assert_eq!(capture.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_display_badges() {
        assert_eq!(badge(StatusTier::Undercrowded), "LOW");
        assert_eq!(badge(StatusTier::Normal), "OK");
        assert_eq!(badge(StatusTier::NearlyFull), "NEAR");
        assert_eq!(badge(StatusTier::Overcrowded), "FULL!");
        assert_eq!(badge(StatusTier::Green), "OK");
        assert_eq!(badge(StatusTier::Yellow), "NEAR");
        assert_eq!(badge(StatusTier::Red), "FULL!");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate("Narahenpita Junction", 12), "Narahenpita ");
        assert_eq!(truncate("Pettah", 12), "Pettah");
    }
}
