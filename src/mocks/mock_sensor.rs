// This file is only compiled during tests

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::hardware::AbsoluteAngleSensor;

/// Absolute sensor that plays back a script, then holds the last value.
pub struct MockSensor {
    script: VecDeque<f64>,
    last: f64,
    pub failing: bool,
    pub reads: usize,
}

impl MockSensor {
    pub fn fixed(angle: f64) -> Self {
        Self::scripted(&[], angle)
    }

    pub fn fixed_degrees(degrees: f64) -> Self {
        Self::fixed(degrees.to_radians())
    }

    pub fn scripted(readings: &[f64], then: f64) -> Self {
        Self {
            script: readings.iter().copied().collect(),
            last: then,
            failing: false,
            reads: 0,
        }
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.script.clear();
        self.last = angle;
    }
}

impl AbsoluteAngleSensor for MockSensor {
    fn read_angle(&mut self) -> Result<f64> {
        self.reads += 1;
        if self.failing {
            return Err(Error::Device("mock sensor offline".to_string()));
        }
        Ok(self.script.pop_front().unwrap_or(self.last))
    }
}
