//! # Gamepad Event Mapper
//!
//! Folds raw evdev events from the gamepad into a [`RawInput`] snapshot.
//!
//! ## Inputs Used
//!
//! | Input | evdev Code | Range | Role |
//! |-------|------------|-------|------|
//! | Left Stick Y | ABS_Y | 0-255 | Left axis raw sample |
//! | Right Stick Y | ABS_RZ | 0-255 | Right axis raw sample |
//! | PS | BTN_MODE | 0/1 | Recalibrate |
//! | L1 | BTN_TL | 0/1 | Left boost |
//! | R1 | BTN_TR | 0/1 | Right boost |
//!
//! Stick values are rescaled from the 8-bit gamepad range into the 12-bit
//! raw domain `[0, 4095]` the calibration works in. Everything else is
//! ignored.
//!
//! ## Usage
//!
//! ```no_run
//! use dualstick_cal::controller::events::InputEventMapper;
//! use dualstick_cal::controller::dualsense::DualSenseController;
//!
//! let mut controller = DualSenseController::open()?;
//! let mut mapper = InputEventMapper::new();
//!
//! for event in controller.fetch_events()? {
//!     mapper.process_event(&event);
//! }
//! println!("Left raw: {}", mapper.state().left_raw);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};

use super::input::RawInput;
use crate::calibration::RAW_MAX;

/// Raw axis range reported by the gamepad.
pub const AXIS_MIN: i32 = 0;
/// Raw axis range reported by the gamepad.
pub const AXIS_MAX: i32 = 255;

/// Rescales a gamepad axis value (0-255) into the raw sample domain (0-4095).
///
/// Out-of-range values are clamped first.
///
/// # Examples
///
/// ```
/// use dualstick_cal::controller::events::scale_axis_to_raw;
///
/// assert_eq!(scale_axis_to_raw(0), 0);
/// assert_eq!(scale_axis_to_raw(255), 4095);
/// assert_eq!(scale_axis_to_raw(-20), 0);
/// ```
#[must_use]
pub fn scale_axis_to_raw(value: i32) -> u16 {
    let clamped = value.clamp(AXIS_MIN, AXIS_MAX);
    let scaled = clamped * i32::from(RAW_MAX) / (AXIS_MAX - AXIS_MIN);
    // Bounded by RAW_MAX
    scaled as u16
}

/// Accumulates evdev events into the current input snapshot.
///
/// Not thread-safe; owned by the reader thread.
#[derive(Debug, Default)]
pub struct InputEventMapper {
    state: RawInput,
}

impl InputEventMapper {
    /// Creates a mapper with both sticks at rest and all buttons released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> &RawInput {
        &self.state
    }

    /// Processes a single evdev event.
    pub fn process_event(&mut self, event: &InputEvent) {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.process_axis_event(axis, event.value()),
            InputEventKind::Key(key) => self.process_key_event(key, event.value() != 0),
            _ => {
                // Sync, misc and force-feedback events carry nothing we use
            }
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) {
        match axis {
            AbsoluteAxisType::ABS_Y => self.state.left_raw = scale_axis_to_raw(value),
            AbsoluteAxisType::ABS_RZ => self.state.right_raw = scale_axis_to_raw(value),
            _ => {}
        }
    }

    fn process_key_event(&mut self, key: Key, pressed: bool) {
        match key {
            Key::BTN_MODE => self.state.recalibrate = pressed,
            Key::BTN_TL => self.state.left_boost = pressed,
            Key::BTN_TR => self.state.right_boost = pressed,
            _ => {}
        }
    }
}
