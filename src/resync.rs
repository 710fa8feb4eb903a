//! Periodic re-zeroing of the relative steer encoder against the absolute sensor.
//!
//! The absolute sensor is occasionally not ready when the robot powers up, so the
//! seed taken at construction can be wrong. While the module sits still the
//! relative encoder is overwritten with a fresh absolute reading every
//! `reset_iterations` control ticks. A module that never stops is never
//! corrected; drift is only fixed at rest.

use log::{debug, warn};

use crate::config::ResyncConfig;
use crate::hardware::{AbsoluteAngleSensor, RelativePositionActuator};

/// What the policy wants done on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncDecision {
    /// Wheel is turning; the stationary count was cleared.
    Moving,
    /// Stationary for this many consecutive ticks.
    Settling(u32),
    /// Threshold reached, re-zero now. The count is already back at zero.
    Resync,
}

pub struct ResyncPolicy {
    velocity_threshold: f64,
    reset_iterations: u32,
    stationary_samples: u32,
}

impl ResyncPolicy {
    pub fn new(config: ResyncConfig) -> Self {
        Self {
            velocity_threshold: config.velocity_threshold.abs(),
            reset_iterations: config.reset_iterations.max(1),
            stationary_samples: 0,
        }
    }

    /// Number of consecutive low-velocity ticks seen so far.
    pub fn get_stationary_samples(&self) -> u32 {
        self.stationary_samples
    }

    pub fn reset(&mut self) {
        self.stationary_samples = 0;
    }

    /// Advance the state machine by one control tick.
    pub fn observe(&mut self, angular_velocity: f64) -> ResyncDecision {
        // NaN compares false, so check the stationary side explicitly
        let stationary = angular_velocity.abs() < self.velocity_threshold;
        if !stationary {
            self.stationary_samples = 0;
            return ResyncDecision::Moving;
        }

        self.stationary_samples += 1;
        if self.stationary_samples >= self.reset_iterations {
            self.stationary_samples = 0;
            ResyncDecision::Resync
        } else {
            ResyncDecision::Settling(self.stationary_samples)
        }
    }

    /// Run one tick against the hardware and return the position the caller
    /// should treat as current.
    ///
    /// On a resync the relative encoder is set to the absolute reading and that
    /// reading is returned. If the sensor read or the encoder reset fails the
    /// encoder's own position is returned and the next attempt waits for another
    /// full stationary window.
    pub fn sync_position<A, S>(&mut self, actuator: &mut A, sensor: &mut S) -> f64
    where
        A: RelativePositionActuator,
        S: AbsoluteAngleSensor,
    {
        let position = actuator.get_position();
        if self.observe(actuator.get_velocity()) != ResyncDecision::Resync {
            return position;
        }

        let absolute = match sensor.read_angle() {
            Ok(angle) if angle.is_finite() => angle,
            Ok(angle) => {
                warn!("Skipping steer encoder resync, absolute angle invalid: {}", angle);
                return position;
            }
            Err(e) => {
                warn!("Skipping steer encoder resync, absolute read failed: {}", e);
                return position;
            }
        };

        if let Err(e) = actuator.set_position(absolute) {
            warn!("Failed to set steer encoder position: {}", e);
            return position;
        }

        debug!(
            "Steer encoder resynced: {:.4} rad -> {:.4} rad",
            position, absolute
        );
        absolute
    }
}
