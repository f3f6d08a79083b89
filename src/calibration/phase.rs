//! # Calibration Phase Machine
//!
//! Sequences `FullRange -> ZeroCenter -> Control` for both axes together.
//!
//! Transitions are gated by a [`HoldTimer`]: the pair condition must stay true
//! on every tick for the hold duration. A single failing tick discards all
//! accumulated hold time; the timer goes back to "not started", not to zero
//! elapsed.
//!
//! All state lives in [`CalibrationState`], owned by the caller and mutated
//! only through the step functions below.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{BoundedAccumulator, CalibrationSettings, StickCalibration};
use crate::tone::ToneCue;

/// Sub-phase of calibration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Sweep both sticks end to end.
    FullRange,
    /// Release both sticks and hold still.
    ZeroCenter,
}

/// Process-wide controller mode.
///
/// The calibration phase only exists while calibrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Calibrating, in the given phase.
    Calibration(CalibrationPhase),
    /// Calibrated; live samples are mapped to commands.
    Control,
}

impl ControlMode {
    /// Short label for logs and the display.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ControlMode::Calibration(CalibrationPhase::FullRange) => "full-range",
            ControlMode::Calibration(CalibrationPhase::ZeroCenter) => "zero-center",
            ControlMode::Control => "control",
        }
    }
}

/// Minimum-dwell gate for a phase condition.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use dualstick_cal::calibration::HoldTimer;
///
/// let hold = Duration::from_millis(500);
/// let t0 = Instant::now();
/// let mut timer = HoldTimer::new();
///
/// assert!(!timer.observe(true, t0, hold)); // starts the timer
/// assert!(!timer.observe(true, t0 + Duration::from_millis(499), hold));
/// assert!(timer.observe(true, t0 + Duration::from_millis(500), hold));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldTimer {
    since: Option<Instant>,
}

impl HoldTimer {
    /// Creates a timer in the "not started" state.
    #[must_use]
    pub const fn new() -> Self {
        Self { since: None }
    }

    /// Instant the condition first became true, if it currently holds.
    #[must_use]
    pub fn since(&self) -> Option<Instant> {
        self.since
    }

    /// Back to "not started".
    pub fn reset(&mut self) {
        self.since = None;
    }

    /// Records this tick's condition and reports whether it has held for `hold`.
    ///
    /// The tick that starts the timer never reports completion.
    pub fn observe(&mut self, ok: bool, now: Instant, hold: Duration) -> bool {
        if !ok {
            self.since = None;
            return false;
        }
        match self.since {
            None => {
                self.since = Some(now);
                false
            }
            Some(start) => now.saturating_duration_since(start) >= hold,
        }
    }
}

/// Outcome of one calibration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    /// The pair condition for the current phase held on this tick.
    pub ready_to_switch: bool,
    /// Cue to play when this step caused a transition.
    pub cue: Option<ToneCue>,
}

/// Complete calibration state for both axes.
#[derive(Debug, Clone)]
pub struct CalibrationState {
    settings: CalibrationSettings,
    mode: ControlMode,
    left: StickCalibration,
    right: StickCalibration,
    left_window: BoundedAccumulator,
    right_window: BoundedAccumulator,
    range_hold: HoldTimer,
    center_hold: HoldTimer,
}

impl CalibrationState {
    /// Creates the state already in `Calibration/FullRange`.
    #[must_use]
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            mode: ControlMode::Calibration(CalibrationPhase::FullRange),
            left: StickCalibration::new(),
            right: StickCalibration::new(),
            left_window: BoundedAccumulator::new(),
            right_window: BoundedAccumulator::new(),
            range_hold: HoldTimer::new(),
            center_hold: HoldTimer::new(),
        }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Left axis calibration.
    #[must_use]
    pub fn left(&self) -> &StickCalibration {
        &self.left
    }

    /// Right axis calibration.
    #[must_use]
    pub fn right(&self) -> &StickCalibration {
        &self.right
    }

    /// Left axis zero-center window.
    #[must_use]
    pub fn left_window(&self) -> &BoundedAccumulator {
        &self.left_window
    }

    /// Right axis zero-center window.
    #[must_use]
    pub fn right_window(&self) -> &BoundedAccumulator {
        &self.right_window
    }

    /// Full-range hold timer.
    #[must_use]
    pub fn range_hold(&self) -> &HoldTimer {
        &self.range_hold
    }

    /// Zero-center hold timer.
    #[must_use]
    pub fn center_hold(&self) -> &HoldTimer {
        &self.center_hold
    }

    /// Drops everything and restarts at `Calibration/FullRange`.
    ///
    /// Unconditional: works from any mode, including mid-control.
    pub fn recalibrate(&mut self) -> ToneCue {
        info!(from = self.mode.name(), "Entering calibration");
        self.mode = ControlMode::Calibration(CalibrationPhase::FullRange);
        self.range_hold.reset();
        self.center_hold.reset();
        self.left.reset();
        self.right.reset();
        self.left_window.clear();
        self.right_window.clear();
        ToneCue::Recalibrating
    }

    /// Full-range phase: widen both axes and advance once both spans held.
    pub fn step_full_range(&mut self, left_raw: u16, right_raw: u16, now: Instant) -> PhaseStep {
        self.left.widen(left_raw);
        self.right.widen(right_raw);

        let threshold = self.settings.range_threshold;
        let range_ok = self.left.range_ok(threshold) && self.right.range_ok(threshold);

        if !self.range_hold.observe(range_ok, now, self.settings.hold) {
            return PhaseStep {
                ready_to_switch: range_ok,
                cue: None,
            };
        }

        info!(
            left_min = self.left.min(),
            left_max = self.left.max(),
            right_min = self.right.min(),
            right_max = self.right.max(),
            "Full range captured, release sticks"
        );
        self.mode = ControlMode::Calibration(CalibrationPhase::ZeroCenter);
        self.range_hold.reset();
        self.center_hold.reset();
        self.left_window.clear();
        self.right_window.clear();

        PhaseStep {
            ready_to_switch: true,
            cue: Some(ToneCue::RangeCaptured),
        }
    }

    /// Zero-center phase: wait for both windows to settle, then finalize.
    pub fn step_zero_center(&mut self, left_raw: u16, right_raw: u16, now: Instant) -> PhaseStep {
        self.left_window.update(left_raw);
        self.right_window.update(right_raw);

        let span = self.settings.stability_span;
        let stable = self.left_window.is_stable(span) && self.right_window.is_stable(span);

        if !stable {
            self.center_hold.reset();
            self.left_window.seed(left_raw);
            self.right_window.seed(right_raw);
            debug!(left_raw, right_raw, "Sticks moving, zero-center window reseeded");
            return PhaseStep {
                ready_to_switch: false,
                cue: None,
            };
        }

        if !self.center_hold.observe(true, now, self.settings.hold) {
            return PhaseStep {
                ready_to_switch: true,
                cue: None,
            };
        }

        let left_center = self.left_window.average();
        let right_center = self.right_window.average();
        self.left.finalize(left_center);
        self.right.finalize(right_center);
        self.mode = ControlMode::Control;
        self.center_hold.reset();

        info!(left_center, right_center, "Calibration complete");

        PhaseStep {
            ready_to_switch: true,
            cue: Some(ToneCue::CalibrationComplete),
        }
    }
}
