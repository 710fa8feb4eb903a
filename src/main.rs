use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use clap::Parser;
use log::{error, info, warn};

use swerve_steer::{
    AlignOutcome, AppConfig, MagneticAbsoluteEncoder, SteerMotor, SteeringController, SystemClock,
    hold,
};

type Module = SteeringController<SteerMotor, MagneticAbsoluteEncoder>;

#[derive(Parser, Debug)]
#[command(name = "swerve-steer")]
#[command(about = "Align swerve steering modules and hold a wheel angle")]
struct Args {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wheel angle to hold, in degrees
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    angle: f64,

    /// Skip startup alignment and trust the seeded encoder position
    #[arg(long)]
    no_align: bool,

    /// Exit after startup alignment
    #[arg(long, conflicts_with = "no_align")]
    align_only: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            AppConfig::from_file(path)?
        }
        None => AppConfig::default(),
    };

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let period = config.control_period();
    let gains = config.steer.pid_gains();

    let mut modules: Vec<(String, Module)> = Vec::with_capacity(config.modules.len());
    for hw in &config.modules {
        info!("Initializing steering module '{}'", hw.name);
        let motor = SteerMotor::new(hw, gains, period.as_secs_f64())?;
        let encoder = MagneticAbsoluteEncoder::new(hw.i2c_bus, hw.absolute_offset)?;
        let controller = SteeringController::new(motor, encoder, &config.steer);
        modules.push((hw.name.clone(), controller));
    }

    if modules.is_empty() {
        warn!("No steering modules configured, nothing to do");
        return Ok(());
    }

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| format!("Error setting Ctrl-C handler: {}", e))?;

    // Alignment is bounded by its timeout, so a signal during it is picked up
    // right after
    if !args.no_align {
        align_all(&mut modules);
    }

    if args.align_only || !running.load(Ordering::Relaxed) {
        hold::stop_all(&mut modules);
        return Ok(());
    }

    let target = args.angle.to_radians();
    info!(
        "Holding {:.1}° at {:.0} Hz on {} module(s)",
        args.angle,
        config.control_rate_hz,
        modules.len()
    );

    hold::hold_angle(&mut modules, target, period, &running);
    Ok(())
}

/// Align every module at once, one thread per module.
fn align_all(modules: &mut [(String, Module)]) {
    info!("Aligning {} steering module(s)...", modules.len());

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(modules.len());
        for (name, module) in modules.iter_mut() {
            let handle = scope.spawn(move || module.align_to_start(&mut SystemClock::new()));
            handles.push((name.clone(), handle));
        }

        for (name, handle) in handles {
            match handle.join() {
                Ok(Ok(outcome @ AlignOutcome::OnTarget { .. })) => {
                    info!("✓ [{}] {}", name, outcome)
                }
                Ok(Ok(outcome)) => warn!("[{}] {}", name, outcome),
                Ok(Err(e)) => error!("[{}] Alignment failed: {}", name, e),
                Err(_) => error!("[{}] Alignment thread panicked", name),
            }
        }
    });
}
