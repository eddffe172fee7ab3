//! Debounced convergence detection.

/// Counts consecutive calm ticks and reports quiescence once a window fills.
///
/// A single noisy tick resets the count, so one lucky tick can't end a run.
#[derive(Debug, Clone)]
pub struct QuiescenceTracker {
    window: u64,
    consecutive: u64,
}

impl QuiescenceTracker {
    /// Require `window` consecutive calm ticks. A window of zero behaves like one.
    pub fn new(window: u64) -> Self {
        Self {
            window: window.max(1),
            consecutive: 0,
        }
    }

    /// Record one tick. Returns true once the window is full.
    pub fn observe(&mut self, calm: bool) -> bool {
        if calm {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }
        self.is_quiescent()
    }

    pub fn is_quiescent(&self) -> bool {
        self.consecutive >= self.window
    }

    pub fn consecutive(&self) -> u64 {
        self.consecutive
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_full_window() {
        let mut q = QuiescenceTracker::new(3);
        assert!(!q.observe(true));
        assert!(!q.observe(true));
        assert!(q.observe(true));
    }

    #[test]
    fn noisy_tick_resets() {
        let mut q = QuiescenceTracker::new(2);
        q.observe(true);
        q.observe(false);
        assert_eq!(q.consecutive(), 0);
        assert!(!q.observe(true));
        assert!(q.observe(true));
    }

    #[test]
    fn zero_window_is_one() {
        let mut q = QuiescenceTracker::new(0);
        assert_eq!(q.window(), 1);
        assert!(!q.is_quiescent());
        assert!(q.observe(true));
    }
}
