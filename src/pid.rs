//! Discrete PID controller with optional continuous (wrap-around) input.

use crate::config::PidGains;

pub struct PidController {
    gains: PidGains,
    /// Seconds between calls to [`PidController::calculate`].
    period: f64,
    /// Input range that wraps, e.g. (0, 360) for a heading in degrees.
    continuous: Option<(f64, f64)>,
    tolerance: f64,
    output_limit: f64,
    position_error: f64,
    prev_error: f64,
    total_error: f64,
    has_measurement: bool,
}

impl PidController {
    pub fn new(gains: PidGains, period: f64) -> Self {
        Self {
            gains,
            period,
            continuous: None,
            tolerance: 0.05,
            output_limit: f64::INFINITY,
            position_error: 0.0,
            prev_error: 0.0,
            total_error: 0.0,
            has_measurement: false,
        }
    }

    /// Treat `minimum` and `maximum` as the same point so error is measured the
    /// short way around.
    pub fn enable_continuous_input(&mut self, minimum: f64, maximum: f64) {
        self.continuous = Some((minimum, maximum));
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Clamp the output magnitude. Also bounds the integrator.
    pub fn set_output_limit(&mut self, limit: f64) {
        self.output_limit = limit.abs();
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn get_position_error(&self) -> f64 {
        self.position_error
    }

    /// True once a measurement has been taken and the last error was within tolerance.
    pub fn at_setpoint(&self) -> bool {
        self.has_measurement && self.position_error.abs() < self.tolerance
    }

    pub fn reset(&mut self) {
        self.position_error = 0.0;
        self.prev_error = 0.0;
        self.total_error = 0.0;
        self.has_measurement = false;
    }

    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        let mut error = setpoint - measurement;
        if let Some((minimum, maximum)) = self.continuous {
            let half_range = (maximum - minimum) / 2.0;
            error = wrap(error, -half_range, half_range);
        }

        if !self.has_measurement {
            self.prev_error = error;
        }
        self.has_measurement = true;
        self.position_error = error;

        if self.gains.i != 0.0 {
            self.total_error += error * self.period;
            if self.output_limit.is_finite() {
                let i_max = self.output_limit / self.gains.i.abs();
                self.total_error = self.total_error.clamp(-i_max, i_max);
            }
        }

        let derivative = (error - self.prev_error) / self.period;
        self.prev_error = error;

        let output =
            self.gains.p * error + self.gains.i * self.total_error + self.gains.d * derivative;
        output.clamp(-self.output_limit, self.output_limit)
    }
}

fn wrap(value: f64, minimum: f64, maximum: f64) -> f64 {
    let range = maximum - minimum;
    let mut wrapped = (value - minimum) % range;
    if wrapped < 0.0 {
        wrapped += range;
    }
    wrapped + minimum
}
