//! # Stick Range Calibration
//!
//! Per-axis calibration record and the full-range capture rules.
//!
//! A fresh record has an inverted range (`min = u16::MAX`, `max = 0`) so the
//! first sample sets both bounds. Bounds only ever widen while the user sweeps
//! the stick; the center is written once, when the zero-center phase
//! completes.

use super::RAW_MIDPOINT;

/// Observed extremes and rest position of one stick axis.
///
/// Mapping is inert until [`ready`](StickCalibration::ready) is true.
/// When ready, `max > min` and `min <= center <= max`.
///
/// # Examples
///
/// ```
/// use dualstick_cal::calibration::StickCalibration;
///
/// let mut cal = StickCalibration::new();
/// cal.widen(100);
/// cal.widen(3900);
/// assert_eq!(cal.min(), 100);
/// assert_eq!(cal.max(), 3900);
/// assert!(cal.range_ok(3072));
/// assert!(!cal.ready());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickCalibration {
    min: u16,
    max: u16,
    center: u16,
    ready: bool,
}

impl Default for StickCalibration {
    fn default() -> Self {
        Self::new()
    }
}

impl StickCalibration {
    /// Creates an uncalibrated record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: u16::MAX,
            max: 0,
            center: RAW_MIDPOINT,
            ready: false,
        }
    }

    /// Creates an already-finalized record from known bounds.
    ///
    /// Returns `None` unless `min < max` and `min <= center <= max`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualstick_cal::calibration::StickCalibration;
    ///
    /// let cal = StickCalibration::ready_with_bounds(0, 2048, 4095).unwrap();
    /// assert!(cal.ready());
    ///
    /// assert!(StickCalibration::ready_with_bounds(10, 5, 4095).is_none());
    /// assert!(StickCalibration::ready_with_bounds(100, 100, 100).is_none());
    /// ```
    #[must_use]
    pub fn ready_with_bounds(min: u16, center: u16, max: u16) -> Option<Self> {
        if max <= min || center < min || center > max {
            return None;
        }
        Some(Self {
            min,
            max,
            center,
            ready: true,
        })
    }

    /// Lowest raw value observed.
    #[must_use]
    pub fn min(&self) -> u16 {
        self.min
    }

    /// Highest raw value observed.
    #[must_use]
    pub fn max(&self) -> u16 {
        self.max
    }

    /// Raw value representing the rest position.
    #[must_use]
    pub fn center(&self) -> u16 {
        self.center
    }

    /// True once both calibration phases have completed.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// True once at least one sample has been folded in.
    #[must_use]
    pub fn has_samples(&self) -> bool {
        self.min <= self.max
    }

    /// Observed span, or 0 when no range has been seen yet.
    #[must_use]
    pub fn span(&self) -> u16 {
        if self.max > self.min {
            self.max - self.min
        } else {
            0
        }
    }

    /// Widens the observed bounds to include `raw`. Never narrows.
    pub fn widen(&mut self, raw: u16) {
        if raw < self.min {
            self.min = raw;
        }
        if raw > self.max {
            self.max = raw;
        }
    }

    /// True when the observed span reaches `threshold`.
    #[must_use]
    pub fn range_ok(&self, threshold: u16) -> bool {
        self.max > self.min && self.max - self.min >= threshold
    }

    /// Marks the calibration complete with the given rest position.
    ///
    /// The zero-center phase is the only caller. A rest position outside
    /// the swept bounds widens them, so `min <= center <= max` holds.
    pub(crate) fn finalize(&mut self, center: u16) {
        self.widen(center);
        self.center = center;
        self.ready = true;
    }

    /// Restores the initial, uncalibrated values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
