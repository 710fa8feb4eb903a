use std::cell::Cell;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use log::info;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::pwm::{Channel, Polarity, Pwm};

use crate::config::{ModuleHardwareConfig, PidGains};
use crate::error::{Error, Result};
use crate::hardware::RelativePositionActuator;
use crate::pid::PidController;

/// Velocity is re-estimated at most this often so a fast caller doesn't divide
/// one encoder edge by a few microseconds.
const VELOCITY_WINDOW_SECS: f64 = 0.01;

#[derive(Clone, Copy)]
struct VelocitySample {
    at: Instant,
    counts: i64,
    velocity: f64,
}

/// Brushed steering motor behind a PWM/DIR driver with a brake select pin and
/// a quadrature encoder on the motor shaft.
///
/// The position loop runs here, once per [`RelativePositionActuator::command_position_setpoint`].
pub struct SteerMotor {
    pwm: Pwm,
    direction: OutputPin,
    brake: OutputPin,
    // Owns the interrupt that feeds `counts`
    _encoder_a: InputPin,
    counts: Arc<AtomicI64>,
    radians_per_count: f64,
    inverted: bool,
    offset: f64,
    brake_mode: bool,
    position_loop: PidController,
    velocity: Cell<VelocitySample>,
}

impl SteerMotor {
    /// `period` is the control loop period in seconds.
    pub fn new(config: &ModuleHardwareConfig, gains: PidGains, period: f64) -> Result<Self> {
        let radians_per_count =
            radians_per_count(config.encoder_counts_per_rev, config.steer_reduction)?;
        let channel = pwm_channel(config.pwm_channel)?;

        let pwm = Pwm::with_frequency(
            channel,
            config.pwm_frequency_hz,
            0.0,
            Polarity::Normal,
            true, // enabled
        )?;

        let gpio = Gpio::new()?;
        let direction = gpio.get(config.direction_pin)?.into_output_low();
        let mut brake = gpio.get(config.brake_pin)?.into_output_low();
        brake.set_high();

        let mut encoder_a = gpio.get(config.encoder_a_pin)?.into_input_pullup();
        let encoder_b = gpio.get(config.encoder_b_pin)?.into_input_pullup();

        let counts = Arc::new(AtomicI64::new(0));
        let edge_counts = Arc::clone(&counts);
        encoder_a.set_async_interrupt(Trigger::RisingEdge, None, move |_| {
            // B is already high on A's rising edge when turning backwards
            let step = if encoder_b.read() == Level::Low { 1 } else { -1 };
            edge_counts.fetch_add(step, Ordering::Relaxed);
        })?;

        let mut position_loop = PidController::new(gains, period.max(1e-3));
        position_loop.set_output_limit(1.0);

        info!(
            "✓ Steer motor '{}' initialized (PWM{}, {:.5} rad/count)",
            config.name, config.pwm_channel, radians_per_count
        );

        Ok(Self {
            pwm,
            direction,
            brake,
            _encoder_a: encoder_a,
            counts,
            radians_per_count,
            inverted: config.inverted,
            offset: 0.0,
            brake_mode: true,
            position_loop,
            velocity: Cell::new(VelocitySample {
                at: Instant::now(),
                counts: 0,
                velocity: 0.0,
            }),
        })
    }

    fn signed_radians_per_count(&self) -> f64 {
        if self.inverted {
            -self.radians_per_count
        } else {
            self.radians_per_count
        }
    }

    fn raw_position(&self) -> f64 {
        self.counts.load(Ordering::Relaxed) as f64 * self.signed_radians_per_count()
    }
}

impl RelativePositionActuator for SteerMotor {
    fn get_position(&self) -> f64 {
        self.raw_position() + self.offset
    }

    fn get_velocity(&self) -> f64 {
        let now = Instant::now();
        let counts = self.counts.load(Ordering::Relaxed);
        let last = self.velocity.get();

        let dt = now.duration_since(last.at).as_secs_f64();
        if dt < VELOCITY_WINDOW_SECS {
            return last.velocity;
        }

        let velocity = (counts - last.counts) as f64 * self.signed_radians_per_count() / dt;
        self.velocity.set(VelocitySample {
            at: now,
            counts,
            velocity,
        });
        velocity
    }

    fn set_position(&mut self, position: f64) -> Result<()> {
        if !position.is_finite() {
            return Err(Error::InvalidParameter(format!("encoder position {}", position)));
        }
        self.offset = position - self.raw_position();
        Ok(())
    }

    fn command_position_setpoint(&mut self, position: f64) -> Result<()> {
        let power = self.position_loop.calculate(self.get_position(), position);
        self.set_output(power)
    }

    fn set_output(&mut self, power: f64) -> Result<()> {
        let (forward, duty_cycle) = motor_command(power, self.inverted);
        if forward {
            self.direction.set_high();
        } else {
            self.direction.set_low();
        }
        self.pwm.set_duty_cycle(duty_cycle)?;
        Ok(())
    }

    fn set_pid_gains(&mut self, gains: PidGains) -> Result<()> {
        self.position_loop.set_gains(gains);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.position_loop.reset();
        self.pwm.set_duty_cycle(0.0)?;
        Ok(())
    }

    fn set_brake_mode(&mut self, on: bool) -> Result<()> {
        self.brake.write(if on { Level::High } else { Level::Low });
        self.brake_mode = on;
        Ok(())
    }

    fn get_brake_mode(&self) -> bool {
        self.brake_mode
    }
}

impl Drop for SteerMotor {
    fn drop(&mut self) {
        // Ensure the motor is released when dropped
        let _ = self.pwm.set_duty_cycle(0.0);
        let _ = self.pwm.disable();
    }
}

fn pwm_channel(channel: u8) -> Result<Channel> {
    match channel {
        0 => Ok(Channel::Pwm0),
        1 => Ok(Channel::Pwm1),
        _ => Err(Error::InvalidParameter(format!(
            "PWM channel {}, use 0 or 1",
            channel
        ))),
    }
}

fn radians_per_count(counts_per_rev: f64, steer_reduction: f64) -> Result<f64> {
    let value = TAU * steer_reduction / counts_per_rev;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidParameter(format!(
            "encoder counts per rev {} with steer reduction {}",
            counts_per_rev, steer_reduction
        )))
    }
}

/// Direction and duty cycle for a power in [-1, 1].
fn motor_command(power: f64, inverted: bool) -> (bool, f64) {
    let power = if power.is_finite() {
        power.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let signed = if inverted { -power } else { power };
    (signed >= 0.0, signed.abs())
}
