//! Periodic task timing

use std::time::{Duration, Instant};

/// A task that runs whenever its interval has elapsed since the last run
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    name: &'static str,
    interval: Duration,
    last_run: Instant,
}

impl PeriodicTask {
    /// Create a task whose first run is one interval after `start`
    pub fn new(name: &'static str, interval: Duration, start: Instant) -> Self {
        Self {
            name,
            interval,
            last_run: start,
        }
    }

    /// Whether the interval has elapsed at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_run) >= self.interval
    }

    /// Record a run at `now`
    pub fn mark_run(&mut self, now: Instant) {
        self.last_run = now;
    }

    /// Check and mark in one step
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.mark_run(now);
            true
        } else {
            false
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_due_after_interval() {
        let start = Instant::now();
        let mut task = PeriodicTask::new("upload", Duration::from_secs(30), start);

        assert!(!task.poll(start + Duration::from_secs(29)));
        assert!(task.poll(start + Duration::from_secs(30)));
        assert!(!task.poll(start + Duration::from_secs(45)));
        assert!(task.poll(start + Duration::from_secs(61)));
    }

    #[test]
    fn test_manual_run_resets_interval() {
        let start = Instant::now();
        let mut task = PeriodicTask::new("camera", Duration::from_secs(120), start);

        task.mark_run(start + Duration::from_secs(100));
        assert!(!task.is_due(start + Duration::from_secs(150)));
        assert!(task.is_due(start + Duration::from_secs(220)));
    }
}
