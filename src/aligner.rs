//! Startup alignment: turn the wheel to its reference orientation (straight
//! ahead, gearbox left) using only the absolute sensor and raw motor power.
//!
//! The aligner is a small state machine. Call [`StartupAligner::poll`] once per
//! polling interval, or hand it a [`Clock`] and let [`StartupAligner::run`] do
//! the loop. On every exit path (on target, timeout, or error) the motor is
//! stopped and the internal PID controller is dropped.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::AlignerConfig;
use crate::error::{Error, Result};
use crate::hardware::{AbsoluteAngleSensor, RelativePositionActuator};
use crate::pid::PidController;

/// Time source for the blocking runner.
pub trait Clock {
    /// Time since the clock was created.
    fn elapsed(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlignOutcome {
    /// Reached tolerance; the relative encoder was set to `absolute_angle`.
    OnTarget { absolute_angle: f64, elapsed: Duration },
    /// Gave up. The relative encoder was left alone.
    Timeout { absolute_angle: f64, elapsed: Duration },
}

impl AlignOutcome {
    pub fn is_on_target(&self) -> bool {
        matches!(self, AlignOutcome::OnTarget { .. })
    }
}

impl fmt::Display for AlignOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignOutcome::OnTarget {
                absolute_angle,
                elapsed,
            } => write!(
                f,
                "on target at {:.1}° after {} ms",
                absolute_angle.to_degrees(),
                elapsed.as_millis()
            ),
            AlignOutcome::Timeout {
                absolute_angle,
                elapsed,
            } => write!(
                f,
                "timeout at {:.1}° after {} ms",
                absolute_angle.to_degrees(),
                elapsed.as_millis()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlignStatus {
    /// Still converging; `power` was just written to the motor.
    Running { power: f64 },
    Done(AlignOutcome),
}

enum AlignState {
    Ready(PidController),
    Running {
        pid: PidController,
        started: Duration,
    },
    Finished(AlignOutcome),
    Aborted,
}

pub struct StartupAligner {
    config: AlignerConfig,
    state: AlignState,
}

impl StartupAligner {
    pub fn new(config: AlignerConfig) -> Self {
        let period = config.poll_interval().as_secs_f64().max(1e-3);
        let mut pid = PidController::new(config.gains, period);
        pid.enable_continuous_input(0.0, 360.0);
        pid.set_tolerance(config.tolerance_degrees);
        pid.set_output_limit(config.max_power);

        Self {
            config,
            state: AlignState::Ready(pid),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, AlignState::Finished(_) | AlignState::Aborted)
    }

    /// Run one iteration. `now` is any monotonic time; the first call marks the
    /// start of the timeout window.
    pub fn poll<A, S>(&mut self, actuator: &mut A, sensor: &mut S, now: Duration) -> Result<AlignStatus>
    where
        A: RelativePositionActuator,
        S: AbsoluteAngleSensor,
    {
        let (mut pid, started) = match std::mem::replace(&mut self.state, AlignState::Aborted) {
            AlignState::Ready(pid) => {
                if let Err(e) = self.config.validate() {
                    return Err(abort(actuator, e));
                }
                (pid, now)
            }
            AlignState::Running { pid, started } => (pid, started),
            AlignState::Finished(outcome) => {
                self.state = AlignState::Finished(outcome);
                return Ok(AlignStatus::Done(outcome));
            }
            AlignState::Aborted => {
                return Err(Error::Device("startup alignment was aborted".to_string()));
            }
        };

        match self.step(&mut pid, actuator, sensor, now.saturating_sub(started)) {
            Ok(AlignStatus::Running { power }) => {
                self.state = AlignState::Running { pid, started };
                Ok(AlignStatus::Running { power })
            }
            Ok(AlignStatus::Done(outcome)) => {
                info!("Startup alignment {}", outcome);
                self.state = AlignState::Finished(outcome);
                Ok(AlignStatus::Done(outcome))
            }
            Err(e) => Err(abort(actuator, e)),
        }
    }

    /// Poll until done, sleeping the configured interval between iterations.
    pub fn run<A, S, C>(mut self, actuator: &mut A, sensor: &mut S, clock: &mut C) -> Result<AlignOutcome>
    where
        A: RelativePositionActuator,
        S: AbsoluteAngleSensor,
        C: Clock,
    {
        let interval = self.config.poll_interval();
        loop {
            match self.poll(actuator, sensor, clock.elapsed())? {
                AlignStatus::Done(outcome) => return Ok(outcome),
                AlignStatus::Running { .. } => clock.sleep(interval),
            }
        }
    }

    fn step<A, S>(
        &self,
        pid: &mut PidController,
        actuator: &mut A,
        sensor: &mut S,
        elapsed: Duration,
    ) -> Result<AlignStatus>
    where
        A: RelativePositionActuator,
        S: AbsoluteAngleSensor,
    {
        let absolute_angle = read_valid(sensor)?;
        let angle = absolute_angle.to_degrees();

        let max_power = self.config.max_power.abs();
        let power = pid
            .calculate(angle, self.config.target_degrees)
            .clamp(-max_power, max_power);
        actuator.set_output(power)?;

        if pid.at_setpoint() {
            actuator.stop()?;
            let absolute_angle = read_valid(sensor)?;
            actuator.set_position(absolute_angle)?;
            return Ok(AlignStatus::Done(AlignOutcome::OnTarget {
                absolute_angle,
                elapsed,
            }));
        }

        if elapsed >= self.config.timeout() {
            actuator.stop()?;
            return Ok(AlignStatus::Done(AlignOutcome::Timeout {
                absolute_angle,
                elapsed,
            }));
        }

        debug!(
            "angle={:.3}  target={:.1}  error={:.3}  pwr={:.3}",
            angle,
            self.config.target_degrees,
            pid.get_position_error(),
            power
        );

        Ok(AlignStatus::Running { power })
    }
}

/// Stop the motor on the way out of a failed alignment.
fn abort<A: RelativePositionActuator>(actuator: &mut A, error: Error) -> Error {
    warn!("Startup alignment aborted: {}", error);
    if let Err(stop_err) = actuator.stop() {
        warn!("Failed to stop steer motor after alignment error: {}", stop_err);
    }
    error
}

fn read_valid<S: AbsoluteAngleSensor>(sensor: &mut S) -> Result<f64> {
    let angle = sensor.read_angle()?;
    if angle.is_finite() {
        Ok(angle)
    } else {
        Err(Error::InvalidReading(angle))
    }
}
