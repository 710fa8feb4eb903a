// This file is only compiled during tests

use std::time::Duration;

use crate::aligner::Clock;

/// Clock that only moves when slept on.
#[derive(Default)]
pub struct ManualClock {
    now: Duration,
    pub sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        self.now += duration;
    }
}
