//! Steering configuration: design defaults, PID presets and the TOML file layout.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

// ** ENCODER RESYNC ** //

/// Consecutive stationary ticks before the relative encoder is re-zeroed.
pub const ENCODER_RESET_ITERATIONS: u32 = 500;
/// Below this wheel speed (rad/s) the module counts as stationary. 0.5°/s.
pub const ENCODER_RESET_MAX_ANGULAR_VELOCITY: f64 = 0.5 * PI / 180.0;

// ** STARTUP ALIGNMENT ** //

/// Straight ahead with the gearbox on the left, absolute angle 360 == 0.
pub const ALIGN_TARGET_DEGREES: f64 = 360.0;
pub const ALIGN_TOLERANCE_DEGREES: f64 = 0.5;
/// Raw motor power limit while aligning, fraction of full scale.
pub const ALIGN_MAX_POWER: f64 = 0.20;
pub const ALIGN_TIMEOUT_SECS: f64 = 2.0;
pub const ALIGN_POLL_INTERVAL_MS: u64 = 20;
/// Power per degree of error
pub const ALIGN_KP: f64 = 0.01;

// ** CONTROL LOOP ** //
pub const CONTROL_RATE_HZ: f64 = 50.0;

// ** STEER PID PRESETS ** //
const NEO_P: f64 = 0.5;
const NEO_I: f64 = 0.0;
const NEO_D: f64 = 0.05;

const FALCON_500_P: f64 = 0.2;
const FALCON_500_I: f64 = 0.0;
const FALCON_500_D: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl PidGains {
    pub const fn new(p: f64, i: f64, d: f64) -> Self {
        Self { p, i, d }
    }

    pub fn is_finite(&self) -> bool {
        self.p.is_finite() && self.i.is_finite() && self.d.is_finite()
    }
}

/// Default steer gains per motor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SteerPidPreset {
    #[default]
    Neo,
    Falcon500,
}

impl SteerPidPreset {
    pub fn gains(self) -> PidGains {
        match self {
            SteerPidPreset::Neo => PidGains::new(NEO_P, NEO_I, NEO_D),
            SteerPidPreset::Falcon500 => PidGains::new(FALCON_500_P, FALCON_500_I, FALCON_500_D),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResyncConfig {
    /// rad/s
    pub velocity_threshold: f64,
    pub reset_iterations: u32,
}

impl ResyncConfig {
    pub fn validate(&self) -> Result<()> {
        non_negative("steer.resync.velocity_threshold", self.velocity_threshold)
    }
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: ENCODER_RESET_MAX_ANGULAR_VELOCITY,
            reset_iterations: ENCODER_RESET_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlignerConfig {
    pub target_degrees: f64,
    pub tolerance_degrees: f64,
    pub max_power: f64,
    pub timeout_secs: f64,
    pub poll_interval_ms: u64,
    /// Gains act on degrees of error and produce raw motor power.
    pub gains: PidGains,
}

impl AlignerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.target_degrees.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "steer.aligner.target_degrees must be finite, got {}",
                self.target_degrees
            )));
        }
        non_negative("steer.aligner.tolerance_degrees", self.tolerance_degrees)?;
        non_negative("steer.aligner.max_power", self.max_power)?;
        non_negative("steer.aligner.timeout_secs", self.timeout_secs)?;
        if !self.gains.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "steer.aligner.gains must be finite, got {:?}",
                self.gains
            )));
        }
        Ok(())
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            target_degrees: ALIGN_TARGET_DEGREES,
            tolerance_degrees: ALIGN_TOLERANCE_DEGREES,
            max_power: ALIGN_MAX_POWER,
            timeout_secs: ALIGN_TIMEOUT_SECS,
            poll_interval_ms: ALIGN_POLL_INTERVAL_MS,
            gains: PidGains::new(ALIGN_KP, 0.0, 0.0),
        }
    }
}

/// Per-module steering behaviour, shared by every module on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SteerConfig {
    pub preset: SteerPidPreset,
    /// Overrides the preset when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gains: Option<PidGains>,
    pub resync: ResyncConfig,
    pub aligner: AlignerConfig,
}

impl SteerConfig {
    pub fn pid_gains(&self) -> PidGains {
        self.gains.unwrap_or_else(|| self.preset.gains())
    }

    pub fn validate(&self) -> Result<()> {
        let gains = self.pid_gains();
        if !gains.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "steer.gains must be finite, got {:?}",
                gains
            )));
        }
        self.resync.validate()?;
        self.aligner.validate()
    }
}

/// Wiring and mechanics of one steering module on the Raspberry Pi.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleHardwareConfig {
    pub name: String,
    /// Hardware PWM channel, 0 or 1.
    pub pwm_channel: u8,
    pub pwm_frequency_hz: f64,
    pub direction_pin: u8,
    /// Driver brake/coast select, high = brake.
    pub brake_pin: u8,
    pub encoder_a_pin: u8,
    pub encoder_b_pin: u8,
    /// Rising edges on encoder channel A per motor shaft revolution.
    pub encoder_counts_per_rev: f64,
    /// Wheel revolutions per motor revolution.
    pub steer_reduction: f64,
    pub inverted: bool,
    pub i2c_bus: u8,
    /// Absolute reading (radians) when the wheel points straight, gearbox left.
    pub absolute_offset: f64,
}

impl Default for ModuleHardwareConfig {
    fn default() -> Self {
        Self {
            name: "module".to_string(),
            pwm_channel: 0,
            pwm_frequency_hz: 20_000.0,
            direction_pin: 5,
            brake_pin: 6,
            encoder_a_pin: 23,
            encoder_b_pin: 24,
            encoder_counts_per_rev: 28.0,
            // MK4 steer: (15 / 32) * (10 / 60)
            steer_reduction: (15.0 / 32.0) * (10.0 / 60.0),
            inverted: false,
            i2c_bus: 1,
            absolute_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub control_rate_hz: f64,
    pub steer: SteerConfig,
    pub modules: Vec<ModuleHardwareConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            control_rate_hz: CONTROL_RATE_HZ,
            steer: SteerConfig::default(),
            modules: vec![ModuleHardwareConfig::default()],
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. Missing keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML accepts `nan` and `inf`, so parsing alone doesn't bound the values.
    pub fn validate(&self) -> Result<()> {
        if !(self.control_rate_hz.is_finite() && self.control_rate_hz > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "control_rate_hz must be a finite positive rate, got {}",
                self.control_rate_hz
            )));
        }
        self.steer.validate()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn control_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.control_rate_hz.max(1.0))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_presets() {
        assert_eq!(SteerPidPreset::Neo.gains(), PidGains::new(0.5, 0.0, 0.05));
        assert_eq!(SteerPidPreset::Falcon500.gains(), PidGains::new(0.2, 0.0, 0.1));
    }

    #[test]
    fn test_gains_override_preset() {
        let mut steer = SteerConfig::default();
        assert_eq!(steer.pid_gains(), SteerPidPreset::Neo.gains());

        steer.gains = Some(PidGains::new(1.0, 2.0, 3.0));
        assert_eq!(steer.pid_gains(), PidGains::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_gains_finite() {
        assert!(PidGains::new(0.5, 0.0, 0.05).is_finite());
        assert!(!PidGains::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!PidGains::new(0.0, 0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_design_defaults() {
        let steer = SteerConfig::default();
        assert_eq!(steer.resync.reset_iterations, 500);
        assert_abs_diff_eq!(steer.resync.velocity_threshold, 0.0087, epsilon = 1e-4);
        assert_eq!(steer.aligner.timeout(), Duration::from_secs(2));
        assert_eq!(steer.aligner.poll_interval(), Duration::from_millis(20));
        assert_abs_diff_eq!(steer.aligner.max_power, 0.2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> Result<()> {
        let config = AppConfig::from_toml_str(
            r#"
            control_rate_hz = 25.0

            [steer]
            preset = "falcon500"

            [steer.resync]
            reset_iterations = 250

            [[modules]]
            name = "front_left"
            inverted = true
            absolute_offset = 1.25

            [[modules]]
            name = "front_right"
            i2c_bus = 3
            "#,
        )?;

        assert_eq!(config.control_period(), Duration::from_millis(40));
        assert_eq!(config.steer.pid_gains(), SteerPidPreset::Falcon500.gains());
        assert_eq!(config.steer.resync.reset_iterations, 250);
        assert_abs_diff_eq!(
            config.steer.resync.velocity_threshold,
            ENCODER_RESET_MAX_ANGULAR_VELOCITY
        );
        assert_eq!(config.modules.len(), 2);
        assert!(config.modules[0].inverted);
        assert_abs_diff_eq!(config.modules[0].absolute_offset, 1.25);
        assert_eq!(config.modules[1].i2c_bus, 3);
        assert_eq!(config.modules[1].pwm_channel, 0);
        Ok(())
    }

    #[test]
    fn test_explicit_gains_in_toml() -> Result<()> {
        let config = AppConfig::from_toml_str(
            r#"
            [steer.gains]
            p = 0.3
            i = 0.0
            d = 0.02
            "#,
        )?;
        assert_eq!(config.steer.pid_gains(), PidGains::new(0.3, 0.0, 0.02));
        Ok(())
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(AppConfig::from_toml_str("control_rate_hz = \"fast\"").is_err());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let bad = [
            "[steer.aligner]\nmax_power = nan",
            "[steer.aligner]\nmax_power = -0.2",
            "[steer.aligner]\ntimeout_secs = inf",
            "[steer.aligner]\ntolerance_degrees = nan",
            "[steer.aligner]\ntarget_degrees = -inf",
            "[steer.aligner.gains]\np = nan\ni = 0.0\nd = 0.0",
            "[steer.resync]\nvelocity_threshold = nan",
            "[steer.gains]\np = inf\ni = 0.0\nd = 0.0",
            "control_rate_hz = 0.0",
            "control_rate_hz = nan",
        ];
        for text in bad {
            assert!(
                matches!(AppConfig::from_toml_str(text), Err(Error::InvalidParameter(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_infinite_timeout_does_not_overflow() {
        let aligner = AlignerConfig {
            timeout_secs: f64::INFINITY,
            ..AlignerConfig::default()
        };
        assert_eq!(aligner.timeout(), Duration::MAX);
        assert!(aligner.validate().is_err());
    }

    #[test]
    fn test_written_config_reads_back() -> Result<()> {
        let config = AppConfig::default();
        let text = config.to_toml_string()?;
        assert_eq!(AppConfig::from_toml_str(&text)?, config);
        Ok(())
    }
}
