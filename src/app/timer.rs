use std::time::{Duration, Instant};

/// Due/not-due bookkeeping on monotonic time.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    last_fired: Option<Instant>,
    period: Duration,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            last_fired: None,
            period,
        }
    }

    /// Due when never fired, or strictly more than `period` has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.period,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_fired = Some(now);
    }

    pub fn clear(&mut self) {
        self.last_fired = None;
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Source of monotonic time and the only place the controller blocks.
pub trait MonotonicClock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl MonotonicClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
