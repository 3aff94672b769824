use std::time::{Duration, Instant};

/// A frame delay that can be paused and resumed any number of times
/// without drifting.
///
/// Time is passed in explicitly so callers decide the clock.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    remaining: Duration,
    started: Option<Instant>,
}

impl Countdown {
    /// A stopped countdown holding `duration`.
    pub fn new(duration: Duration) -> Self {
        Countdown {
            remaining: duration,
            started: None,
        }
    }

    /// Start (or restart after a pause) counting down from what is left.
    pub fn start(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    /// Stop counting and bank the elapsed time. Returns what is left.
    pub fn pause(&mut self, now: Instant) -> Duration {
        if let Some(started) = self.started.take() {
            self.remaining = self
                .remaining
                .saturating_sub(now.saturating_duration_since(started));
        }
        self.remaining
    }

    /// Time left at `now`.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.started {
            Some(started) => self
                .remaining
                .saturating_sub(now.saturating_duration_since(started)),
            None => self.remaining,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}
