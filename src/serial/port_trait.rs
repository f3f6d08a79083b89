//! Trait abstraction for the command output port, so tests can capture lines

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncWriteExt;

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }
}

/// Standard output as a command port, used when no serial device is configured
pub struct StdoutPort {
    out: tokio::io::Stdout,
}

impl StdoutPort {
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SerialPortIO for StdoutPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.out.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.out.flush().await
    }
}
