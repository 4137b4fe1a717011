//! Kernel identity tracking
//!
//! Tracks the current and previous kernel name across launch-begin events.
//! A name change is one of the two triggers that open a new measurement
//! quantum, so two differently named kernels are never coalesced.

/// Current and previous kernel name, by value
#[derive(Debug, Default)]
pub struct KernelTracker {
    current: String,
    previous: String,
}

impl KernelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift the current name into previous and record the new launch's name.
    ///
    /// Called on every launch-begin event, before the engine's tick.
    pub fn shift(&mut self, name: &str) {
        self.previous = std::mem::replace(&mut self.current, name.to_string());
    }

    /// Did the most recent shift change the kernel identity?
    pub fn changed(&self) -> bool {
        self.current != self.previous
    }

    pub fn current(&self) -> &str {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_records_current_and_previous() {
        let mut tracker = KernelTracker::new();
        tracker.shift("axpy");
        assert_eq!(tracker.current(), "axpy");
        assert!(tracker.changed());

        tracker.shift("dot");
        assert_eq!(tracker.current(), "dot");
        assert!(tracker.changed());
    }

    #[test]
    fn test_repeated_name_is_not_a_change() {
        let mut tracker = KernelTracker::new();
        tracker.shift("axpy");
        tracker.shift("axpy");
        assert!(!tracker.changed());
    }

    #[test]
    fn test_empty_initial_state() {
        let tracker = KernelTracker::new();
        assert_eq!(tracker.current(), "");
        assert!(!tracker.changed());
    }
}
