// This file is only compiled during tests

use crate::config::PidGains;
use crate::error::{Error, Result};
use crate::hardware::RelativePositionActuator;

/// Records every command; position and velocity are set by the test.
#[derive(Default)]
pub struct MockActuator {
    pub position: f64,
    pub velocity: f64,
    pub brake: bool,
    pub gains: Option<PidGains>,
    pub setpoints: Vec<f64>,
    pub outputs: Vec<f64>,
    pub position_resets: Vec<f64>,
    pub stops: usize,
    pub reject_gains: bool,
    pub reject_setpoint: bool,
    pub reject_set_position: bool,
    /// Fail `set_output` once this many outputs have been accepted.
    pub fail_output_after: Option<usize>,
}

impl MockActuator {
    pub fn at(position: f64) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn last_setpoint(&self) -> Option<f64> {
        self.setpoints.last().copied()
    }

    pub fn last_output(&self) -> Option<f64> {
        self.outputs.last().copied()
    }

    fn rejected(operation: &str) -> Error {
        Error::Device(format!("mock rejected {operation}"))
    }
}

impl RelativePositionActuator for MockActuator {
    fn get_position(&self) -> f64 {
        self.position
    }

    fn get_velocity(&self) -> f64 {
        self.velocity
    }

    fn set_position(&mut self, position: f64) -> Result<()> {
        if self.reject_set_position {
            return Err(Self::rejected("set_position"));
        }
        self.position = position;
        self.position_resets.push(position);
        Ok(())
    }

    fn command_position_setpoint(&mut self, position: f64) -> Result<()> {
        if self.reject_setpoint {
            return Err(Self::rejected("setpoint"));
        }
        self.setpoints.push(position);
        Ok(())
    }

    fn set_output(&mut self, power: f64) -> Result<()> {
        if self.fail_output_after.is_some_and(|n| self.outputs.len() >= n) {
            return Err(Self::rejected("output"));
        }
        self.outputs.push(power);
        Ok(())
    }

    fn set_pid_gains(&mut self, gains: PidGains) -> Result<()> {
        if self.reject_gains {
            return Err(Self::rejected("gains"));
        }
        self.gains = Some(gains);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stops += 1;
        Ok(())
    }

    fn set_brake_mode(&mut self, on: bool) -> Result<()> {
        self.brake = on;
        Ok(())
    }

    fn get_brake_mode(&self) -> bool {
        self.brake
    }
}
