//! Angle arithmetic for the steering loop.
//!
//! Absolute sensors report wheel angle in [0, 2π) while the motor's integrated
//! encoder counts without bound across full wheel rotations. These helpers
//! bridge the two.

use std::f64::consts::{PI, TAU};

/// Reduce any radian value into [0, 2π).
pub fn normalize(angle: f64) -> f64 {
    wrap_positive(angle, TAU)
}

/// Same as [`normalize`] but in degrees, [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    wrap_positive(angle, 360.0)
}

fn wrap_positive(value: f64, period: f64) -> f64 {
    let mut reduced = value % period;
    if reduced < 0.0 {
        reduced += period;
    }
    // -1e-17 % period + period rounds up to exactly period
    if reduced >= period { 0.0 } else { reduced }
}

/// Map a reference angle in [0, 2π) onto the unbounded encoder scale so that the
/// result is the closest equivalent angle to `current_position`.
///
/// The position loop is then never asked for more than a half turn of travel.
pub fn unwrap_reference(reference_angle: f64, current_position: f64) -> f64 {
    let current_mod = normalize(current_position);

    let mut adjusted = reference_angle + current_position - current_mod;
    let delta = reference_angle - current_mod;
    if delta > PI {
        adjusted -= TAU;
    } else if delta < -PI {
        adjusted += TAU;
    }
    adjusted
}

/// Signed shortest rotation from `from` to `to`, in (-π, π].
pub fn shortest_difference(from: f64, to: f64) -> f64 {
    let diff = normalize(to - from);
    if diff > PI { diff - TAU } else { diff }
}

/// Mean direction of a set of angles, [0, 2π). `None` when empty or when the
/// angles cancel out.
pub fn circular_mean(angles: &[f64]) -> Option<f64> {
    let (sin, cos) = angles
        .iter()
        .fold((0.0_f64, 0.0_f64), |(s, c), a| (s + a.sin(), c + a.cos()));
    if sin.hypot(cos) < 1e-9 {
        return None;
    }
    Some(normalize(sin.atan2(cos)))
}
