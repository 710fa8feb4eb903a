//! Error types for the steering crate.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("PWM error: {0}")]
    Pwm(#[from] rppal::pwm::Error),

    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// A value handed to the crate was out of its valid domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A sensor returned something that cannot be an angle.
    #[error("Invalid sensor reading: {0}")]
    InvalidReading(f64),

    /// The device answered but refused or failed the request.
    #[error("Device error: {0}")]
    Device(String),
}
