//! # Motionpad
//!
//! Runs the controller pipeline on a host machine with simulated peripherals,
//! writing packets to a real serial link.

use anyhow::{Context, Result};
use std::env;
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use motionpad::config::{Config, ConfigSource, LoggingConfig};
use motionpad::peripherals::sim::{
    spawn_button_script, SimulatedButtons, SimulatedImu, SimulatedJoystick,
};
use motionpad::peripherals::InertialSensor;
use motionpad::pipeline::{self, Peripherals};
use motionpad::serial::ControllerSerial;
use motionpad::telemetry::StatsLogger;

/// Config file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Joystick reads per simulated sweep
const JOYSTICK_READS_PER_SWEEP: u32 = 400;

/// Set up stderr logging plus an optional daily rolling file.
///
/// The returned guard must be held for the life of the process so buffered
/// file output is flushed on exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "motionpad.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first CLI argument, or `config/default.toml`)
///    - Set up logging
///    - Open the serial link
///    - Start the pipeline on simulated peripherals
///
/// 2. **Main Loop**
///    - Write a stats snapshot every `[stats] interval_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Shutdown**
///    - Abort every pipeline task
///    - Log final packet totals
///
/// # Errors
///
/// Returns error if:
/// - The configuration is invalid
/// - No serial device can be opened
/// - The pipeline fails its startup checks
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let (config, source) = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);
    info!("Motionpad v{} starting...", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File => info!("Loaded config from {}", config_path),
        ConfigSource::Defaults => warn!("Config file {} not found, using defaults", config_path),
    }

    let serial = ControllerSerial::open(&config.serial).context("Failed to open serial link")?;
    info!("Serial link open at: {}", serial.device_path());

    let peripherals = Peripherals {
        x_axis: Box::new(SimulatedJoystick::new(config.axis.x_channel, JOYSTICK_READS_PER_SWEEP)),
        y_axis: Box::new(SimulatedJoystick::new(config.axis.y_channel, JOYSTICK_READS_PER_SWEEP)),
        imu: Some(Box::new(SimulatedImu::new(config.orientation.period())) as Box<dyn InertialSensor>),
        buttons: Box::new(SimulatedButtons::new()),
    };

    let handle = pipeline::start(&config, peripherals, serial).context("Pipeline startup failed")?;

    let pins = config.input.button_lines().iter().map(|(pin, _)| *pin).collect();
    let script = spawn_button_script(
        handle.capture().clone(),
        pins,
        Duration::from_millis(config.simulation.button_interval_ms),
    );

    let mut stats_logger = if config.stats.enabled {
        Some(StatsLogger::new(&config.stats).context("Failed to open stats log")?)
    } else {
        None
    };
    let mut stats_interval = interval(Duration::from_millis(config.stats.interval_ms));

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = stats_interval.tick() => {
                let snapshot = handle.snapshot();
                if let Some(logger) = stats_logger.as_mut() {
                    if let Err(e) = logger.write(&snapshot) {
                        warn!("Failed to write stats: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    script.abort();
    let snapshot = handle.snapshot();
    handle.abort();
    info!(
        "Total packets sent: {} ({} bytes, {} write errors, {} dropped samples)",
        snapshot.packets_sent,
        snapshot.bytes_sent,
        snapshot.write_errors,
        snapshot.total_dropped()
    );

    Ok(())
}
