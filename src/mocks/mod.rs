// This module is only compiled during tests

pub mod mock_actuator;
pub mod mock_clock;
pub mod mock_sensor;

pub use mock_actuator::MockActuator;
pub use mock_clock::ManualClock;
pub use mock_sensor::MockSensor;
