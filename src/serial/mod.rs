//! # Serial Command Output
//!
//! Writes one line per control-mode tick to the host link.
//!
//! ## Line Format
//!
//! ```text
//! L:<int>,R:<int>\n
//! ```
//!
//! Both commands are signed decimal integers, e.g. `L:-1000,R:0`.
//!
//! When serial output is disabled in the configuration, lines go to stdout
//! instead.

pub mod port_trait;

use crate::config::SerialConfig;
use crate::error::{DualStickError, Result};
use crate::mapper::CommandPair;
use port_trait::{SerialPortIO, StdoutPort, TokioSerialPort};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Default baud rate for the command link
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Formats a command pair as a complete output line.
///
/// # Examples
///
/// ```
/// use dualstick_cal::mapper::CommandPair;
/// use dualstick_cal::serial::format_command_line;
///
/// let line = format_command_line(&CommandPair { left: 1000, right: -57 });
/// assert_eq!(line, "L:1000,R:-57\n");
/// ```
#[must_use]
pub fn format_command_line(pair: &CommandPair) -> String {
    format!("{}\n", pair)
}

/// Line-oriented command writer.
pub struct CommandSerial {
    port: Box<dyn SerialPortIO>,
    /// Device path, or "stdout"
    device_path: String,
    lines_sent: u64,
}

impl std::fmt::Debug for CommandSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSerial")
            .field("device_path", &self.device_path)
            .field("lines_sent", &self.lines_sent)
            .finish_non_exhaustive()
    }
}

impl CommandSerial {
    /// Opens the output described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the configured port cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dualstick_cal::config::Config;
    /// use dualstick_cal::serial::CommandSerial;
    ///
    /// let config = Config::default();
    /// let serial = CommandSerial::open(&config.serial)?;
    /// println!("Writing commands to {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if !config.enabled {
            info!("Serial output disabled, writing commands to stdout");
            return Ok(Self::with_port(Box::new(StdoutPort::new()), "stdout"));
        }

        debug!("Trying to open serial port: {}", config.port);
        let port = Self::open_port(&config.port, config.baud_rate)
            .map_err(|e| DualStickError::SerialPortNotFound(format!("{} ({})", config.port, e)))?;
        info!("Opened serial port {} at {} baud", config.port, config.baud_rate);

        Ok(Self::with_port(
            Box::new(TokioSerialPort::new(port)),
            &config.port,
        ))
    }

    /// Wraps an already-open port.
    pub fn with_port(port: Box<dyn SerialPortIO>, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            lines_sent: 0,
        }
    }

    /// Open a serial port, 8N1, no flow control
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| DualStickError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Writes one command line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the write or flush fails.
    pub async fn send(&mut self, pair: &CommandPair) -> Result<()> {
        let line = format_command_line(pair);

        self.port
            .write_all(line.as_bytes())
            .await
            .map_err(|e| DualStickError::Serial(format!("Failed to write line: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| DualStickError::Serial(format!("Failed to flush port: {}", e)))?;

        self.lines_sent += 1;
        Ok(())
    }

    /// Where lines are written.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Lines written successfully so far.
    pub fn lines_sent(&self) -> u64 {
        self.lines_sent
    }
}
