use std::time::{Duration, Instant};

use truelevel::bubble::{bubble_offset, cube_rotation};
use truelevel::source::sensor::SensorSource;
use truelevel::{LevelConfig, LevelMonitor, SmoothedState};

/// Dial radius used for the printed bubble position.
const DIAL_RADIUS: f64 = 150.0;
const PRINT_EVERY: Duration = Duration::from_millis(250);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("truelevel: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = LevelConfig::from_env()?;
    log::info!("truelevel: alpha={} rate={:.1} Hz mode={:?}", config.filter.alpha(), config.filter.nominal_hz(), config.mode);

    // no platform sensor binding on the host
    let mut monitor = LevelMonitor::new(config.filter, Box::new(SensorSource::unavailable()));
    monitor.set_mode(config.mode)?;

    let changes = monitor.subscribe();
    monitor.start_updates()?;

    if let Some(message) = monitor.diagnostic() {
        println!("{}", message);
    }

    let started = Instant::now();
    let mut last_print: Option<Instant> = None;

    while started.elapsed() < config.run_time {
        if changes.recv_timeout(PRINT_EVERY).is_err() {
            continue;
        }

        if last_print.is_some_and(|at| at.elapsed() < PRINT_EVERY) {
            continue;
        }

        print_readout(&monitor.snapshot());
        last_print = Some(Instant::now());
    }

    monitor.stop_updates();
    log::info!("truelevel: stopped");
    Ok(())
}

fn print_readout(state: &SmoothedState) {
    let (x, y) = bubble_offset(state, DIAL_RADIUS);
    let cube = cube_rotation(state);

    println!("Roll (X):  {:>8.2}°", state.roll());
    println!("Pitch (Y): {:>8.2}°", state.pitch());
    println!("Yaw (Z):   {:>8.2}°", state.yaw());
    println!("Freq: {:.1} Hz", state.sample_hz());
    println!(
        "{} bubble=({:.1}, {:.1}) cube=({:.3}, {:.3}, {:.3}) rad",
        if state.is_level() { "LEVEL" } else { "tilted" },
        x,
        y,
        cube.x,
        cube.y,
        cube.z
    );
    println!();
}
