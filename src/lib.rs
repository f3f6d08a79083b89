//! # DualStick Calibration Library
//!
//! Auto-calibrating dual-axis hand controller.
//!
//! Raw 12-bit samples from two stick axes are calibrated at runtime (full
//! range sweep, then zero-center settle) and mapped to signed command values
//! written to a serial link as `L:<int>,R:<int>` lines.
//!
//! - [`calibration`]: per-axis range, zero-center window and phase machine
//! - [`mapper`]: raw sample to command conversion
//! - [`driver`]: one-tick controller and the collaborator loop
//! - [`controller`], [`serial`], [`tone`], [`display`], [`telemetry`]:
//!   collaborators

pub mod calibration;
pub mod config;
pub mod controller;
pub mod display;
pub mod driver;
pub mod error;
pub mod mapper;
pub mod serial;
pub mod telemetry;
pub mod tick;
pub mod tone;
