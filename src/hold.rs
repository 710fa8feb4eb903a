//! Fixed-rate loop holding every module at one wheel angle until shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::info;

use crate::hardware::{AbsoluteAngleSensor, RelativePositionActuator};
use crate::steering::SteeringController;

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Command `target` radians to every module once per `period` while `running`
/// is set, then stop every motor.
///
/// Hardware PWM keeps its last duty cycle after the process exits, so the
/// motors are always stopped before this returns.
pub fn hold_angle<A, S>(
    modules: &mut [(String, SteeringController<A, S>)],
    target: f64,
    period: Duration,
    running: &AtomicBool,
) where
    A: RelativePositionActuator,
    S: AbsoluteAngleSensor,
{
    let mut next_tick = Instant::now();
    let mut last_status_update = Instant::now();

    while running.load(Ordering::Relaxed) {
        for (_, module) in modules.iter_mut() {
            module.set_reference_angle(target);
        }

        if last_status_update.elapsed() >= STATUS_INTERVAL {
            log_status(modules);
            last_status_update = Instant::now();
        }

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Overran; don't try to catch up
            next_tick = now;
        }
    }

    stop_all(modules);
}

pub fn stop_all<A, S>(modules: &mut [(String, SteeringController<A, S>)])
where
    A: RelativePositionActuator,
    S: AbsoluteAngleSensor,
{
    info!("Stopping {} steering module(s)", modules.len());
    for (_, module) in modules.iter_mut() {
        module.stop();
    }
}

fn log_status<A, S>(modules: &mut [(String, SteeringController<A, S>)])
where
    A: RelativePositionActuator,
    S: AbsoluteAngleSensor,
{
    for (name, module) in modules.iter_mut() {
        let absolute = match module.get_absolute_angle() {
            Ok(angle) => format!("{:.1}°", angle.to_degrees()),
            Err(e) => format!("N/A ({})", e),
        };
        info!(
            "[{}] reference {:.1}°, encoder {:.1}°, absolute {}, resync {}",
            name,
            module.get_reference_angle().to_degrees(),
            module.get_state_angle().to_degrees(),
            absolute,
            module.get_resync_samples()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SteerConfig;
    use crate::mocks::{MockActuator, MockSensor};

    type MockModule = SteeringController<MockActuator, MockSensor>;

    fn modules(count: usize) -> Vec<(String, MockModule)> {
        (0..count)
            .map(|i| {
                let controller = SteeringController::new(
                    MockActuator::default(),
                    MockSensor::fixed(0.0),
                    &SteerConfig::default(),
                );
                (format!("module_{i}"), controller)
            })
            .collect()
    }

    #[test]
    fn test_cleared_flag_only_stops() {
        let mut modules = modules(2);
        let running = AtomicBool::new(false);

        hold_angle(&mut modules, 1.0, Duration::from_millis(5), &running);

        for (_, module) in &modules {
            assert!(module.actuator().setpoints.is_empty());
            assert_eq!(module.actuator().stops, 1);
        }
    }

    #[test]
    fn test_shutdown_stops_every_motor() {
        let mut modules = modules(2);
        let running = AtomicBool::new(true);

        thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(30));
                running.store(false, Ordering::Relaxed);
            });
            hold_angle(&mut modules, 1.0, Duration::from_millis(5), &running);
        });

        for (_, module) in &modules {
            assert!(!module.actuator().setpoints.is_empty());
            assert_eq!(module.actuator().stops, 1);
            assert_eq!(module.get_reference_angle(), 1.0);
        }
    }
}
