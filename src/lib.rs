pub mod absolute_encoder;
pub mod aligner;
pub mod angle;
pub mod config;
pub mod error;
pub mod hardware;
pub mod hold;
pub mod pid;
pub mod resync;
pub mod steer_motor;
pub mod steering;

// Re-export commonly used types
pub use absolute_encoder::MagneticAbsoluteEncoder;
pub use aligner::{AlignOutcome, Clock, StartupAligner, SystemClock};
pub use config::{AppConfig, SteerConfig};
pub use error::{Error, Result};
pub use hardware::{AbsoluteAngleSensor, RelativePositionActuator};
pub use steer_motor::SteerMotor;
pub use steering::SteeringController;

#[cfg(test)]
pub(crate) mod mocks;
