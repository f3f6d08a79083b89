//! # DualStick
//!
//! Auto-calibrating dual-axis hand controller.
//!
//! Reads both vertical stick axes of a DualSense gamepad, calibrates them at
//! runtime and writes signed commands to a serial link.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, or built-in defaults)
//!    - Set up logging to stderr and optionally a daily log file
//!    - Open the gamepad, the serial link, display, tones and telemetry
//!
//! 2. **Main Loop**
//!    - The ticker signals every 10 ms; each signal runs exactly one tick
//!    - Calibration: sweep both sticks end to end, then release them
//!    - Control: `L:<int>,R:<int>` lines go out once per tick
//!    - PS button restarts calibration at any time
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the loop and logs totals
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=debug cargo run --release -- config/dualstick.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO dualstick_cal: DualStick v0.1.0 starting...
//! INFO dualstick_cal::controller::dualsense: Found DualSense controller at: /dev/input/event5
//! INFO dualstick_cal::serial: Opened serial port /dev/ttyUSB0 at 115200 baud
//! INFO dualstick_cal::calibration::phase: Full range captured, release sticks
//! INFO dualstick_cal::calibration::phase: Calibration complete left_center=2051 right_center=2040
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use dualstick_cal::config::{Config, LoggingConfig};
use dualstick_cal::controller::dualsense::DualSenseController;
use dualstick_cal::controller::EvdevInputSource;
use dualstick_cal::display::{DisplaySink, NullDisplay, TextDisplay};
use dualstick_cal::driver::{Controller, Runner};
use dualstick_cal::serial::CommandSerial;
use dualstick_cal::telemetry::TelemetryLogger;
use dualstick_cal::tick::{spawn_ticker, TickFlag};
use dualstick_cal::tone::LogToneSink;

/// File name prefix for the daily diagnostic log
const LOG_FILE_NAME: &str = "dualstick-cal.log";

/// Filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info";

/// Sets up stderr logging plus an optional daily-rotated file.
///
/// The returned guard must live as long as the program so buffered file
/// lines are flushed on exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // stdout is reserved for command lines when serial is disabled
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    if config.directory.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => Ok(Config::default()),
    }
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("DualStick v{} starting...", env!("CARGO_PKG_VERSION"));

    // Input
    let gamepad = DualSenseController::open_configured(&config.controller.device_path)?;
    if let Some(name) = gamepad.name() {
        info!("Using input device: {}", name);
    }
    let input = EvdevInputSource::spawn(gamepad)?;

    // Outputs
    let serial = CommandSerial::open(&config.serial)?;
    info!("Commands are written to: {}", serial.device_path());

    let tones = LogToneSink::new(!config.tones.enabled);

    let display: Box<dyn DisplaySink> = if config.display.enabled {
        Box::new(TextDisplay::new(std::io::stderr(), config.display_refresh()))
    } else {
        Box::new(NullDisplay)
    };

    let telemetry = if config.telemetry.enabled {
        Some(TelemetryLogger::new(&config.telemetry)?)
    } else {
        None
    };

    let controller = Controller::new(config.calibration_settings(), config.mapping_settings());
    let mut runner = Runner::new(
        controller,
        Box::new(input),
        Box::new(tones),
        display,
        serial,
        telemetry,
    );

    runner.play_startup().await;

    let flag = Arc::new(TickFlag::new());
    let ticker = spawn_ticker(Arc::clone(&flag), config.tick_interval());

    info!(
        "Sampling every {}ms; sweep both sticks end to end, then release them",
        config.sampling.tick_interval_ms
    );
    info!("Press Ctrl+C to exit");

    let result = runner.run(&flag, ctrl_c()).await;
    ticker.abort();

    match result {
        Ok(ticks) => {
            info!("Total ticks: {}", ticks);
            info!("Total lines sent: {}", runner.serial().lines_sent());
            if runner.send_failures() > 0 {
                warn!("Failed sends: {}", runner.send_failures());
            }
            Ok(())
        }
        Err(e) => {
            error!("Sample loop stopped: {}", e);
            Err(e.into())
        }
    }
}
