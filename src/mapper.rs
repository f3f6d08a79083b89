//! # Command Mapper
//!
//! Converts a raw stick sample and a finished calibration into a signed
//! command value.
//!
//! ## Mapping
//!
//! - Raw values above the calibrated center map linearly from
//!   `[center, max]` onto `[0, scale]`.
//! - Raw values below the center map from `[min, center]` onto `[0, scale]`
//!   and are negated.
//! - The result is then sign-inverted: pushing the stick toward `max` gives a
//!   **negative** command. This matches the stick's forward/back wiring and
//!   must stay as is.
//! - The value is clamped to `[-scale, scale]` and values strictly inside
//!   `(-deadzone, deadzone)` collapse to 0.
//!
//! An unready calibration, or a zero-width half range, always maps to 0.
//!
//! ## Usage
//!
//! ```
//! use dualstick_cal::calibration::StickCalibration;
//! use dualstick_cal::mapper::{map_raw_to_command, DEADZONE};
//!
//! let cal = StickCalibration::ready_with_bounds(0, 2048, 4095).unwrap();
//!
//! assert_eq!(map_raw_to_command(2048, &cal, 1000, DEADZONE), 0);
//! assert_eq!(map_raw_to_command(4095, &cal, 1000, DEADZONE), -1000);
//! assert_eq!(map_raw_to_command(0, &cal, 1000, DEADZONE), 1000);
//! ```

use std::fmt;

use crate::calibration::StickCalibration;

/// Output scale used when boost is not held.
pub const NORMAL_SCALE: i16 = 1000;

/// Output scale used while boost is held.
pub const BOOST_SCALE: i16 = 2000;

/// Commands strictly inside `(-DEADZONE, DEADZONE)` are reported as 0.
pub const DEADZONE: i16 = 40;

/// Scale and deadzone applied by [`CommandMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingSettings {
    /// Full-deflection command without boost.
    pub normal_scale: i16,
    /// Full-deflection command with boost held.
    pub boost_scale: i16,
    /// Symmetric deadzone around 0.
    pub deadzone: i16,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            normal_scale: NORMAL_SCALE,
            boost_scale: BOOST_SCALE,
            deadzone: DEADZONE,
        }
    }
}

/// Collapses values strictly inside `(-deadzone, deadzone)` to 0.
///
/// # Examples
///
/// ```
/// use dualstick_cal::mapper::apply_deadzone;
///
/// assert_eq!(apply_deadzone(39, 40), 0);
/// assert_eq!(apply_deadzone(-39, 40), 0);
/// assert_eq!(apply_deadzone(40, 40), 40);
/// assert_eq!(apply_deadzone(-40, 40), -40);
/// ```
#[must_use]
pub fn apply_deadzone(value: i16, deadzone: i16) -> i16 {
    // Widened so `-i16::MIN` cannot overflow
    let (v, d) = (i32::from(value), i32::from(deadzone));
    if v > -d && v < d {
        0
    } else {
        value
    }
}

/// Maps one raw sample to a command in `[-scale, scale]`.
///
/// Pure function of its inputs. A non-positive `scale` maps to 0.
#[must_use]
pub fn map_raw_to_command(raw: u16, cal: &StickCalibration, scale: i16, deadzone: i16) -> i16 {
    if !cal.ready() || scale <= 0 {
        return 0;
    }

    let raw = i32::from(raw);
    let center = i32::from(cal.center());
    let scale_f = f32::from(scale);

    let value = if raw >= center {
        let denom = i32::from(cal.max()) - center;
        if denom <= 0 {
            return 0;
        }
        let ratio = (raw - center) as f32 / denom as f32;
        (ratio * scale_f) as i32
    } else {
        let denom = center - i32::from(cal.min());
        if denom <= 0 {
            return 0;
        }
        let ratio = (center - raw) as f32 / denom as f32;
        -((ratio * scale_f) as i32)
    };

    // Stick wiring: toward max is a negative command.
    let value = -value;

    let scale = i32::from(scale);
    let clamped = value.clamp(-scale, scale);

    // In range after the clamp since |scale| fits in i16.
    apply_deadzone(clamped as i16, deadzone)
}

/// Both axes' commands for one tick.
///
/// Formats as the serial line body `L:<int>,R:<int>`.
///
/// # Examples
///
/// ```
/// use dualstick_cal::mapper::CommandPair;
///
/// let pair = CommandPair { left: -1000, right: 250 };
/// assert_eq!(pair.to_string(), "L:-1000,R:250");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandPair {
    /// Left axis command.
    pub left: i16,
    /// Right axis command.
    pub right: i16,
}

impl fmt::Display for CommandPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L:{},R:{}", self.left, self.right)
    }
}

/// Applies [`MappingSettings`] with a per-tick boost selection.
///
/// Boost has no memory: it only affects the call it is passed to.
///
/// # Examples
///
/// ```
/// use dualstick_cal::calibration::StickCalibration;
/// use dualstick_cal::mapper::CommandMapper;
///
/// let mapper = CommandMapper::default();
/// let cal = StickCalibration::ready_with_bounds(0, 2048, 4095).unwrap();
///
/// assert_eq!(mapper.map(0, &cal, false), 1000);
/// assert_eq!(mapper.map(0, &cal, true), 2000);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandMapper {
    settings: MappingSettings,
}

impl CommandMapper {
    /// Creates a mapper with the given settings.
    #[must_use]
    pub fn new(settings: MappingSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &MappingSettings {
        &self.settings
    }

    /// Scale for this tick.
    #[must_use]
    pub fn scale_for(&self, boost: bool) -> i16 {
        if boost {
            self.settings.boost_scale
        } else {
            self.settings.normal_scale
        }
    }

    /// Maps one sample with the scale selected by `boost`.
    #[must_use]
    pub fn map(&self, raw: u16, cal: &StickCalibration, boost: bool) -> i16 {
        map_raw_to_command(raw, cal, self.scale_for(boost), self.settings.deadzone)
    }
}
