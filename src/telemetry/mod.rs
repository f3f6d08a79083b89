//! # Telemetry Module
//!
//! Command log written as JSON Lines with file rotation.
//!
//! Each record is one control-mode tick's output:
//!
//! ```text
//! {"timestamp":"2026-01-01T12:00:00.000+00:00","left":-1000,"right":0,"left_boost":false,"right_boost":false}
//! ```
//!
//! - Records are sampled: at most one per `log_interval_ms`
//! - A new file starts after `max_records_per_file` records
//! - Only the newest `max_files_to_keep` files are retained
//!
//! Calibration results are never written here; every boot calibrates again.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::{DualStickError, Result};
use crate::mapper::CommandPair;

/// Prefix shared by every log file name.
const FILE_PREFIX: &str = "commands_";

/// Extension of every log file.
const FILE_EXTENSION: &str = "jsonl";

/// One logged command pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    /// RFC 3339 wall-clock time
    pub timestamp: String,
    pub left: i16,
    pub right: i16,
    pub left_boost: bool,
    pub right_boost: bool,
}

impl CommandRecord {
    /// Builds a record stamped with the current UTC time.
    #[must_use]
    pub fn now(pair: &CommandPair, left_boost: bool, right_boost: bool) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            left: pair.left,
            right: pair.right,
            left_boost,
            right_boost,
        }
    }
}

/// Rotating JSONL writer for command records.
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    interval: Duration,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files_opened: u64,
    records_written: u64,
    last_record: Option<Instant>,
}

impl std::fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("log_dir", &self.log_dir)
            .field("records_in_file", &self.records_in_file)
            .field("records_written", &self.records_written)
            .finish_non_exhaustive()
    }
}

impl TelemetryLogger {
    /// Creates the log directory if needed. No file is opened until the
    /// first record.
    ///
    /// # Errors
    ///
    /// Returns `Telemetry` if the directory cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dualstick_cal::config::TelemetryConfig;
    /// use dualstick_cal::telemetry::TelemetryLogger;
    ///
    /// let logger = TelemetryLogger::new(&TelemetryConfig::default())?;
    /// println!("Logging to {}", logger.log_dir().display());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir).map_err(|e| {
            DualStickError::Telemetry(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
        info!("Command log directory: {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            interval: Duration::from_millis(config.log_interval_ms),
            writer: None,
            records_in_file: 0,
            files_opened: 0,
            records_written: 0,
            last_record: None,
        })
    }

    /// Directory the log files live in.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Records written since creation.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Logs `pair` unless the previous record is younger than the interval.
    ///
    /// Returns true when a record was written.
    ///
    /// # Errors
    ///
    /// Returns `Telemetry`, `Json` or `Io` errors from file handling.
    pub fn record(
        &mut self,
        pair: &CommandPair,
        left_boost: bool,
        right_boost: bool,
        now: Instant,
    ) -> Result<bool> {
        if let Some(last) = self.last_record {
            if now.saturating_duration_since(last) < self.interval {
                return Ok(false);
            }
        }

        let record = CommandRecord::now(pair, left_boost, right_boost);
        self.write_record(&record)?;
        self.last_record = Some(now);
        Ok(true)
    }

    /// Appends one record, rotating first if the current file is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn write_record(&mut self, record: &CommandRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }

        self.records_in_file += 1;
        self.records_written += 1;
        Ok(())
    }

    /// Starts a new file and prunes old ones.
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.files_opened,
            FILE_EXTENSION
        );
        let path = self.log_dir.join(name);
        let file = File::create(&path).map_err(|e| {
            DualStickError::Telemetry(format!("Failed to create {}: {}", path.display(), e))
        })?;
        debug!("Opened command log {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.files_opened += 1;

        self.prune()
    }

    /// Deletes the oldest log files beyond `max_files_to_keep`.
    fn prune(&self) -> Result<()> {
        let mut files = log_files(&self.log_dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names sort chronologically
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old command log {}: {}", path.display(), e);
            } else {
                debug!("Removed old command log {}", path.display());
            }
        }
        Ok(())
    }
}

/// Command log files in `dir`, unsorted.
fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(FILE_PREFIX))
            .unwrap_or(false)
            && path.extension().map(|ext| ext == FILE_EXTENSION).unwrap_or(false);
        if is_log {
            files.push(path);
        }
    }
    Ok(files)
}
