//! # Calibration Module
//!
//! Two-phase auto-calibration of a pair of stick axes.
//!
//! ## Phases
//!
//! 1. **Full range**: the user sweeps both sticks end to end. Each axis
//!    widens its observed `min`/`max` until the span covers at least
//!    three quarters of the raw domain, and that must hold for 500 ms.
//! 2. **Zero center**: the user releases the sticks. Samples are collected
//!    into a window that must stay within 30 raw units for 500 ms; the
//!    window average becomes the calibrated center.
//!
//! After both phases the controller switches to control mode and the
//! [`mapper`](crate::mapper) turns raw samples into commands.
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use dualstick_cal::calibration::{CalibrationSettings, CalibrationState};
//!
//! let mut state = CalibrationState::new(CalibrationSettings::default());
//! let start = Instant::now();
//!
//! // Sweep both sticks for one second
//! for i in 0..100u64 {
//!     let raw = if i % 2 == 0 { 0 } else { 4095 };
//!     state.step_full_range(raw, raw, start + Duration::from_millis(i * 10));
//! }
//! assert!(state.left().range_ok(state.settings().range_threshold));
//! ```

pub mod phase;
pub mod range;
pub mod zero_center;

use std::time::Duration;

pub use phase::{CalibrationPhase, CalibrationState, ControlMode, HoldTimer, PhaseStep};
pub use range::StickCalibration;
pub use zero_center::BoundedAccumulator;

/// Number of distinct raw values produced by the analog front end (12-bit).
pub const RAW_RESOLUTION: u16 = 4096;

/// Largest raw sample value.
pub const RAW_MAX: u16 = RAW_RESOLUTION - 1;

/// Raw midpoint, used as the center before calibration completes.
pub const RAW_MIDPOINT: u16 = RAW_RESOLUTION / 2;

/// Minimum span (three quarters of the raw domain) for the full-range phase.
pub const RANGE_THRESHOLD: u16 = (RAW_RESOLUTION * 3) / 4;

/// Zero-center windows must stay strictly below this span to count as stable.
pub const STABILITY_SPAN: u16 = 30;

/// How long a phase condition must hold before the phase advances.
pub const CALIBRATION_HOLD: Duration = Duration::from_millis(500);

/// Thresholds used by the calibration phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSettings {
    /// Minimum `max - min` span required in the full-range phase.
    pub range_threshold: u16,
    /// Zero-center window span limit (exclusive).
    pub stability_span: u16,
    /// Dwell time for both phase transitions.
    pub hold: Duration,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            range_threshold: RANGE_THRESHOLD,
            stability_span: STABILITY_SPAN,
            hold: CALIBRATION_HOLD,
        }
    }
}
