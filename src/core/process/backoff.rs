use std::time::Duration;

/// Linearly growing idle wait, capped, reset on activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleBackoff {
    step: Duration,
    cap: Duration,
    current: Duration,
}

impl IdleBackoff {
    pub fn new(step: Duration, cap: Duration) -> Self {
        let step = step.max(Duration::from_micros(1));
        let cap = cap.max(step);
        Self {
            step,
            cap,
            current: step,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Called after an idle interval elapsed with nothing to do.
    pub fn grow(&mut self) {
        self.current = (self.current + self.step).min(self.cap);
    }

    /// Called whenever a pipe produced data.
    pub fn reset(&mut self) {
        self.current = self.step;
    }

    pub fn is_capped(&self) -> bool {
        self.current == self.cap
    }
}
