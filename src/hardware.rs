//! Narrow interfaces the steering core drives.
//!
//! Production implementations live in [`crate::absolute_encoder`] and
//! [`crate::steer_motor`]; tests use the fakes in `mocks`.

use crate::config::PidGains;
use crate::error::Result;

/// Absolute wheel angle sensor, one per module.
pub trait AbsoluteAngleSensor {
    /// Wheel angle in radians, [0, 2π). May be stale or wrong briefly after
    /// power-on.
    fn read_angle(&mut self) -> Result<f64>;
}

/// Steering motor with an integrated relative encoder and position loop.
///
/// Positions are wheel radians on an unbounded scale that keeps counting
/// across full rotations.
pub trait RelativePositionActuator {
    fn get_position(&self) -> f64;

    /// Wheel angular velocity, rad/s.
    fn get_velocity(&self) -> f64;

    /// Hard reset of the encoder so it reads `position` from now on.
    fn set_position(&mut self, position: f64) -> Result<()>;

    /// Hand a target position to the closed position loop.
    fn command_position_setpoint(&mut self, position: f64) -> Result<()>;

    /// Open-loop motor power in [-1, 1], bypassing the position loop.
    fn set_output(&mut self, power: f64) -> Result<()>;

    fn set_pid_gains(&mut self, gains: PidGains) -> Result<()>;

    /// Zero output immediately.
    fn stop(&mut self) -> Result<()>;

    fn set_brake_mode(&mut self, on: bool) -> Result<()>;

    fn get_brake_mode(&self) -> bool;
}
