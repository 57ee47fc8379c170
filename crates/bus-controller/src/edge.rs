//! Level-to-edge detection for sampled digital inputs

/// Detects press edges by comparing each sampled level to the previous one
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current level, returning `true` on a released-to-pressed edge
    pub fn pressed(&mut self, level: bool) -> bool {
        let edge = level && !self.previous;
        self.previous = level;
        edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_button_fires_once() {
        let mut edge = EdgeDetector::new();
        let fired: Vec<bool> = [false, true, true, true, false, true]
            .into_iter()
            .map(|level| edge.pressed(level))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }
}
