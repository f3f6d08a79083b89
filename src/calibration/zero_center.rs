//! # Zero-Center Window
//!
//! Running min/max/sum/count over the samples collected while the sticks
//! rest. When the window is judged unstable it is reseeded from the current
//! sample instead of being emptied, so the window follows recent motion and
//! the next stable stretch starts counting immediately.

use super::RAW_MIDPOINT;

/// Running bounds and sum over a stream of raw samples.
///
/// `count == 0` means no samples; otherwise `min <= max`.
///
/// # Examples
///
/// ```
/// use dualstick_cal::calibration::BoundedAccumulator;
///
/// let mut window = BoundedAccumulator::new();
/// for raw in [2040, 2050, 2045] {
///     window.update(raw);
/// }
/// assert_eq!(window.span(), 10);
/// assert_eq!(window.average(), 2045);
/// assert!(window.is_stable(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedAccumulator {
    min: u16,
    max: u16,
    sum: u64,
    count: u32,
}

impl Default for BoundedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedAccumulator {
    /// Creates an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min: u16::MAX,
            max: 0,
            sum: 0,
            count: 0,
        }
    }

    /// Lowest sample in the window.
    #[must_use]
    pub fn min(&self) -> u16 {
        self.min
    }

    /// Highest sample in the window.
    #[must_use]
    pub fn max(&self) -> u16 {
        self.max
    }

    /// Number of samples in the window.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// True when no samples have been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Empties the window.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Replaces the window with a single sample.
    pub fn seed(&mut self, raw: u16) {
        self.min = raw;
        self.max = raw;
        self.sum = u64::from(raw);
        self.count = 1;
    }

    /// Folds a sample into the window, seeding it when empty.
    pub fn update(&mut self, raw: u16) {
        if self.count == 0 {
            self.seed(raw);
            return;
        }
        if raw < self.min {
            self.min = raw;
        }
        if raw > self.max {
            self.max = raw;
        }
        self.sum += u64::from(raw);
        self.count = self.count.saturating_add(1);
    }

    /// Window span, 0 when empty.
    #[must_use]
    pub fn span(&self) -> u16 {
        if self.count == 0 {
            0
        } else {
            self.max - self.min
        }
    }

    /// True when the window holds samples and its span is below `span_limit`.
    #[must_use]
    pub fn is_stable(&self, span_limit: u16) -> bool {
        self.count > 0 && self.max - self.min < span_limit
    }

    /// Integer mean of the window, or the raw midpoint when empty.
    #[must_use]
    pub fn average(&self) -> u16 {
        if self.count == 0 {
            return RAW_MIDPOINT;
        }
        // The mean of u16 samples always fits in u16.
        (self.sum / u64::from(self.count)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let window = BoundedAccumulator::new();
        assert!(window.is_empty());
        assert_eq!(window.span(), 0);
        assert!(!window.is_stable(30));
        assert_eq!(window.average(), RAW_MIDPOINT);
    }

    #[test]
    fn test_update_on_empty_seeds() {
        let mut window = BoundedAccumulator::new();
        window.update(1500);
        assert_eq!(window.min(), 1500);
        assert_eq!(window.max(), 1500);
        assert_eq!(window.count(), 1);
        assert_eq!(window.average(), 1500);
        assert!(window.is_stable(30));
    }

    #[test]
    fn test_update_widens_and_accumulates() {
        let mut window = BoundedAccumulator::new();
        for raw in [2000, 2010, 1990, 2004] {
            window.update(raw);
        }
        assert_eq!(window.min(), 1990);
        assert_eq!(window.max(), 2010);
        assert_eq!(window.count(), 4);
        assert_eq!(window.average(), 2001);
    }

    #[test]
    fn test_stability_limit_is_exclusive() {
        let mut window = BoundedAccumulator::new();
        window.update(2000);
        window.update(2029);
        assert!(window.is_stable(30));

        window.update(2030);
        assert!(!window.is_stable(30));
    }

    #[test]
    fn test_seed_discards_previous_window() {
        let mut window = BoundedAccumulator::new();
        window.update(100);
        window.update(4000);
        window.seed(2048);
        assert_eq!(window.count(), 1);
        assert_eq!(window.span(), 0);
        assert_eq!(window.average(), 2048);
    }

    #[test]
    fn test_clear() {
        let mut window = BoundedAccumulator::new();
        window.update(10);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window, BoundedAccumulator::new());
    }

    #[test]
    fn test_average_truncates() {
        let mut window = BoundedAccumulator::new();
        window.update(2000);
        window.update(2001);
        assert_eq!(window.average(), 2000);
    }
}
