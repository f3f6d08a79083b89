//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! `default_*` functions below, which match the built-in constants.
//!
//! ```toml
//! [calibration]
//! range_threshold = 3072
//! stability_span = 30
//! hold_ms = 500
//!
//! [mapping]
//! normal_scale = 1000
//! boost_scale = 2000
//! deadzone = 40
//!
//! [sampling]
//! tick_interval_ms = 10
//!
//! [serial]
//! enabled = true
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::calibration::{CalibrationSettings, RAW_RESOLUTION};
use crate::error::{DualStickError, Result};
use crate::mapper::MappingSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub tones: ToneConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Calibration thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default = "default_range_threshold")]
    pub range_threshold: u16,

    #[serde(default = "default_stability_span")]
    pub stability_span: u16,

    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

/// Command mapping scales
#[derive(Debug, Deserialize, Clone)]
pub struct MappingConfig {
    #[serde(default = "default_normal_scale")]
    pub normal_scale: i16,

    #[serde(default = "default_boost_scale")]
    pub boost_scale: i16,

    #[serde(default = "default_deadzone")]
    pub deadzone: i16,
}

/// Sample loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ControllerConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub device_path: String,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// When false, command lines go to stdout
    #[serde(default = "default_serial_enabled")]
    pub enabled: bool,

    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Display configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_display_enabled")]
    pub enabled: bool,

    #[serde(default = "default_min_refresh_ms")]
    pub min_refresh_ms: u64,
}

/// Tone configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ToneConfig {
    #[serde(default = "default_tones_enabled")]
    pub enabled: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily log files; empty logs to stderr only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_range_threshold() -> u16 { crate::calibration::RANGE_THRESHOLD }
fn default_stability_span() -> u16 { crate::calibration::STABILITY_SPAN }
fn default_hold_ms() -> u64 { 500 }

fn default_normal_scale() -> i16 { crate::mapper::NORMAL_SCALE }
fn default_boost_scale() -> i16 { crate::mapper::BOOST_SCALE }
fn default_deadzone() -> i16 { crate::mapper::DEADZONE }

fn default_tick_interval_ms() -> u64 { 10 }

fn default_serial_enabled() -> bool { true }
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { crate::serial::DEFAULT_BAUD_RATE }

fn default_display_enabled() -> bool { true }
fn default_min_refresh_ms() -> u64 { 100 }

fn default_tones_enabled() -> bool { true }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            range_threshold: default_range_threshold(),
            stability_span: default_stability_span(),
            hold_ms: default_hold_ms(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            normal_scale: default_normal_scale(),
            boost_scale: default_boost_scale(),
            deadzone: default_deadzone(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: default_serial_enabled(),
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_display_enabled(),
            min_refresh_ms: default_min_refresh_ms(),
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            enabled: default_tones_enabled(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> DualStickError {
    DualStickError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dualstick_cal::config::Config;
    ///
    /// let config = Config::load("config/dualstick.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Examples
    ///
    /// ```
    /// use dualstick_cal::config::Config;
    ///
    /// let config = Config::from_toml_str("[mapping]\ndeadzone = 10\n")?;
    /// assert_eq!(config.mapping.deadzone, 10);
    /// assert_eq!(config.mapping.normal_scale, 1000);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Calibration thresholds
        if self.calibration.range_threshold == 0
            || self.calibration.range_threshold >= RAW_RESOLUTION
        {
            return Err(invalid(format!(
                "range_threshold must be between 1 and {}",
                RAW_RESOLUTION - 1
            )));
        }

        if self.calibration.stability_span == 0
            || self.calibration.stability_span >= RAW_RESOLUTION
        {
            return Err(invalid(format!(
                "stability_span must be between 1 and {}",
                RAW_RESOLUTION - 1
            )));
        }

        if self.calibration.hold_ms == 0 || self.calibration.hold_ms > 10000 {
            return Err(invalid("hold_ms must be between 1 and 10000"));
        }

        // Mapping scales
        if self.mapping.normal_scale <= 0 {
            return Err(invalid("normal_scale must be greater than 0"));
        }

        if self.mapping.boost_scale < self.mapping.normal_scale {
            return Err(invalid("boost_scale must be at least normal_scale"));
        }

        if self.mapping.deadzone < 0 || self.mapping.deadzone >= self.mapping.normal_scale {
            return Err(invalid("deadzone must be between 0 and normal_scale - 1"));
        }

        // Timing
        if self.sampling.tick_interval_ms == 0 || self.sampling.tick_interval_ms > 1000 {
            return Err(invalid("tick_interval_ms must be between 1 and 1000"));
        }

        if self.display.min_refresh_ms > 10000 {
            return Err(invalid("min_refresh_ms must be between 0 and 10000"));
        }

        // Serial port
        if self.serial.enabled && self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty when enabled"));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600]
            .contains(&self.serial.baud_rate)
        {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }

    /// Calibration thresholds as used by the phase machine
    #[must_use]
    pub fn calibration_settings(&self) -> CalibrationSettings {
        CalibrationSettings {
            range_threshold: self.calibration.range_threshold,
            stability_span: self.calibration.stability_span,
            hold: Duration::from_millis(self.calibration.hold_ms),
        }
    }

    /// Scales and deadzone as used by the command mapper
    #[must_use]
    pub fn mapping_settings(&self) -> MappingSettings {
        MappingSettings {
            normal_scale: self.mapping.normal_scale,
            boost_scale: self.mapping.boost_scale,
            deadzone: self.mapping.deadzone,
        }
    }

    /// Sample loop period
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.sampling.tick_interval_ms)
    }

    /// Minimum time between display redraws
    #[must_use]
    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(self.display.min_refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    // ==================== Defaults Tests ====================

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_built_in_settings() {
        let config = create_valid_config();
        assert_eq!(config.calibration_settings(), CalibrationSettings::default());
        assert_eq!(config.mapping_settings(), MappingSettings::default());
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.display_refresh(), Duration::from_millis(100));
        assert!(!config.telemetry.enabled);
        assert!(config.controller.device_path.is_empty());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.calibration.range_threshold, 3072);
        assert_eq!(config.mapping.boost_scale, 2000);
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[calibration]
hold_ms = 250

[mapping]
boost_scale = 1500

[serial]
enabled = false

[telemetry]
enabled = true
log_dir = "/tmp/dualstick"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.calibration_settings().hold, Duration::from_millis(250));
        assert_eq!(config.mapping.boost_scale, 1500);
        assert!(!config.serial.enabled);
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.log_dir, "/tmp/dualstick");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/dualstick.toml");
        assert!(matches!(result, Err(DualStickError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("[mapping\ndeadzone = 1");
        assert!(matches!(result, Err(DualStickError::Config(_))));
    }

    // ==================== Calibration Validation Tests ====================

    #[test]
    fn test_range_threshold_zero() {
        let mut config = create_valid_config();
        config.calibration.range_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_range_threshold_too_high() {
        let mut config = create_valid_config();
        config.calibration.range_threshold = 4096;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stability_span_zero() {
        let mut config = create_valid_config();
        config.calibration.stability_span = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hold_ms_zero() {
        let mut config = create_valid_config();
        config.calibration.hold_ms = 0;
        assert!(config.validate().is_err());
    }

    // ==================== Mapping Validation Tests ====================

    #[test]
    fn test_normal_scale_non_positive() {
        let mut config = create_valid_config();
        config.mapping.normal_scale = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_boost_below_normal() {
        let mut config = create_valid_config();
        config.mapping.boost_scale = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_deadzone() {
        let mut config = create_valid_config();
        config.mapping.deadzone = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_deadzone_allowed() {
        let mut config = create_valid_config();
        config.mapping.deadzone = 0;
        assert!(config.validate().is_ok());
    }

    // ==================== Timing Validation Tests ====================

    #[test]
    fn test_tick_interval_zero() {
        let mut config = create_valid_config();
        config.sampling.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_too_high() {
        let mut config = create_valid_config();
        config.sampling.tick_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_interval_zero() {
        let mut config = create_valid_config();
        config.telemetry.log_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    // ==================== Serial Validation Tests ====================

    #[test]
    fn test_empty_serial_port_when_enabled() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port_when_disabled() {
        let mut config = create_valid_config();
        config.serial.enabled = false;
        config.serial.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    // ==================== Telemetry Validation Tests ====================

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_error_message_names_field() {
        let mut config = create_valid_config();
        config.mapping.boost_scale = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("boost_scale"));
    }
}
