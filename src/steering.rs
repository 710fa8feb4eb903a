//! Closed-loop steering for one swerve module.

use log::{info, warn};

use crate::aligner::{AlignOutcome, Clock, StartupAligner};
use crate::angle;
use crate::config::{AlignerConfig, PidGains, SteerConfig};
use crate::error::Result;
use crate::hardware::{AbsoluteAngleSensor, RelativePositionActuator};
use crate::resync::ResyncPolicy;

/// Owns a module's steering motor and absolute sensor and turns a wheel angle
/// request into a position setpoint for the motor's position loop.
pub struct SteeringController<A, S> {
    actuator: A,
    sensor: S,
    resync: ResyncPolicy,
    aligner_config: AlignerConfig,
    /// Last requested angle, as given by the caller.
    reference_angle: f64,
}

impl<A, S> SteeringController<A, S>
where
    A: RelativePositionActuator,
    S: AbsoluteAngleSensor,
{
    /// Seeds the relative encoder from the absolute sensor and applies the
    /// configured steer gains.
    pub fn new(mut actuator: A, mut sensor: S, config: &SteerConfig) -> Self {
        match sensor.read_angle() {
            Ok(angle) if angle.is_finite() => match actuator.set_position(angle) {
                Ok(()) => info!("Steer encoder seeded at {:.1}°", angle.to_degrees()),
                Err(e) => warn!("Failed to seed steer encoder position: {}", e),
            },
            Ok(angle) => warn!("Not seeding steer encoder, absolute angle invalid: {}", angle),
            Err(e) => warn!("Not seeding steer encoder, absolute read failed: {}", e),
        }

        let gains = config.pid_gains();
        if gains.is_finite()
            && let Err(e) = actuator.set_pid_gains(gains)
        {
            warn!("Failed to set steer PID constants: {}", e);
        }

        Self {
            actuator,
            sensor,
            resync: ResyncPolicy::new(config.resync),
            aligner_config: config.aligner,
            reference_angle: 0.0,
        }
    }

    /// Point the wheel at `angle` radians. Any finite value is accepted.
    ///
    /// Runs the encoder resync check, then sends the closest encoder-scale
    /// equivalent of the angle to the position loop.
    pub fn set_reference_angle(&mut self, angle: f64) {
        if !angle.is_finite() {
            warn!("Ignoring non-finite steer reference angle: {}", angle);
            return;
        }
        let current = self
            .resync
            .sync_position(&mut self.actuator, &mut self.sensor);
        let adjusted = angle::unwrap_reference(angle::normalize(angle), current);

        self.reference_angle = angle;

        if let Err(e) = self.actuator.command_position_setpoint(adjusted) {
            warn!("Failed to command steer setpoint {:.4} rad: {}", adjusted, e);
        }
    }

    pub fn get_reference_angle(&self) -> f64 {
        self.reference_angle
    }

    /// Wheel angle from the relative encoder, [0, 2π).
    pub fn get_state_angle(&self) -> f64 {
        angle::normalize(self.actuator.get_position())
    }

    /// Wheel angle straight from the absolute sensor.
    pub fn get_absolute_angle(&mut self) -> Result<f64> {
        self.sensor.read_angle()
    }

    pub fn set_pid_constants(&mut self, p: f64, i: f64, d: f64) {
        let gains = PidGains::new(p, i, d);
        if !gains.is_finite() {
            warn!("Ignoring non-finite steer PID constants: {:?}", gains);
            return;
        }
        if let Err(e) = self.actuator.set_pid_gains(gains) {
            warn!("Failed to set steer PID constants: {}", e);
        }
    }

    pub fn set_brake_mode(&mut self, on: bool) {
        if let Err(e) = self.actuator.set_brake_mode(on) {
            warn!("Failed to set steer idle mode: {}", e);
        }
    }

    pub fn get_brake_mode(&self) -> bool {
        self.actuator.get_brake_mode()
    }

    /// Cut motor output. Reference and resync state are kept.
    pub fn stop(&mut self) {
        if let Err(e) = self.actuator.stop() {
            warn!("Failed to stop steer motor: {}", e);
        }
    }

    /// Drive the wheel to its straight-ahead orientation with the startup
    /// aligner, blocking until it finishes.
    ///
    /// Holding `&mut self` keeps the periodic path off this module for the
    /// duration.
    pub fn align_to_start<C: Clock>(&mut self, clock: &mut C) -> Result<AlignOutcome> {
        let outcome = StartupAligner::new(self.aligner_config).run(
            &mut self.actuator,
            &mut self.sensor,
            clock,
        )?;
        if outcome.is_on_target() {
            // encoder was just re-zeroed
            self.resync.reset();
        }
        Ok(outcome)
    }

    pub fn get_resync_samples(&self) -> u32 {
        self.resync.get_stationary_samples()
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}
