use std::thread;
use std::time::Duration;

use clap::Parser;
use swerve_steer::MagneticAbsoluteEncoder;
use swerve_steer::angle;

#[derive(Parser, Debug)]
#[command(name = "calibrate")]
#[command(about = "Measure the absolute encoder offset of one steering module")]
struct Args {
    /// I2C bus the module's absolute encoder is on
    #[arg(short, long, default_value_t = 1)]
    bus: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║     Steering Offset Calibration Tool                 ║");
    println!("╚══════════════════════════════════════════════════════╝\n");

    println!("Instructions:");
    println!("1. Lift the module so the wheel turns freely");
    println!("2. Point the wheel STRAIGHT AHEAD");
    println!("3. Turn it so the gearbox is on the LEFT side");
    println!("4. Hold it still while samples are collected");
    println!("5. Press Ctrl+C when the offset stops changing\n");

    println!("Starting in 5 seconds...\n");
    thread::sleep(Duration::from_secs(5));

    let mut encoder = MagneticAbsoluteEncoder::new(args.bus, 0.0)?;

    let mut samples: Vec<f64> = Vec::new();
    let mut min_deg = f64::MAX;
    let mut max_deg = f64::MIN;

    println!("Collecting samples... (HOLD STILL!)");
    println!(
        "\n{:^8} | {:^12} | {:^20} | {:^20}",
        "Sample", "Raw", "Range", "Offset"
    );
    println!("{:-<8}-+-{:-<12}-+-{:-<20}-+-{:-<20}", "", "", "", "");

    loop {
        if let Ok(raw) = encoder.read_raw_angle() {
            let raw_deg = raw.to_degrees();
            min_deg = min_deg.min(raw_deg);
            max_deg = max_deg.max(raw_deg);
            samples.push(raw);

            // Print update every 10 samples
            if samples.len() % 10 == 0 {
                match angle::circular_mean(&samples) {
                    Some(offset) => {
                        println!(
                            "{:^8} | {:>10.2}° | {:>7.2}° to {:>7.2}° | absolute_offset = {:.5}",
                            samples.len(),
                            raw_deg,
                            min_deg,
                            max_deg,
                            offset
                        );
                    }
                    None => println!(
                        "{:^8} | readings cancel out, hold the wheel still",
                        samples.len()
                    ),
                }
            }
        }

        thread::sleep(Duration::from_millis(100));
    }
}
