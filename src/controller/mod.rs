//! # Controller Module
//!
//! Gamepad input feeding the sample loop.
//!
//! This module handles:
//! - Detecting and opening the gamepad via evdev
//! - Folding evdev events into per-tick [`RawInput`] snapshots
//! - Rescaling stick axes into the 12-bit raw sample domain
//! - Edge detection for the recalibrate button

pub mod dualsense;
pub mod events;
pub mod input;

pub use input::{ButtonEdge, EvdevInputSource, InputSource, RawInput};
