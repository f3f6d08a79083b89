//! # Input Snapshots
//!
//! Per-tick view of the raw sample source and the three buttons.
//!
//! evdev reads block, so a dedicated reader thread folds events into a
//! snapshot and publishes it over a [`watch`] channel. The sample loop only
//! ever reads the latest snapshot and never waits on the device.

use std::thread::JoinHandle;

use tokio::sync::watch;
use tracing::{info, warn};

use super::dualsense::DualSenseController;
use super::events::InputEventMapper;
use crate::calibration::RAW_MIDPOINT;
use crate::error::{DualStickError, Result};

/// One tick's worth of collaborator input.
///
/// Raw samples are in `[0, 4095]`. Buttons are levels: `recalibrate` is turned
/// into an edge by [`ButtonEdge`], the boost buttons are used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInput {
    /// Left axis raw sample.
    pub left_raw: u16,
    /// Right axis raw sample.
    pub right_raw: u16,
    /// Recalibrate button level.
    pub recalibrate: bool,
    /// Left boost button level.
    pub left_boost: bool,
    /// Right boost button level.
    pub right_boost: bool,
}

impl Default for RawInput {
    fn default() -> Self {
        Self::sticks(RAW_MIDPOINT, RAW_MIDPOINT)
    }
}

impl RawInput {
    /// Snapshot with the given stick samples and no buttons held.
    #[must_use]
    pub fn sticks(left_raw: u16, right_raw: u16) -> Self {
        Self {
            left_raw,
            right_raw,
            recalibrate: false,
            left_boost: false,
            right_boost: false,
        }
    }
}

/// Rising-edge detector for a button level.
///
/// # Examples
///
/// ```
/// use dualstick_cal::controller::ButtonEdge;
///
/// let mut edge = ButtonEdge::new();
/// assert!(edge.rising(true));
/// assert!(!edge.rising(true)); // still held
/// assert!(!edge.rising(false));
/// assert!(edge.rising(true));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonEdge {
    previous: bool,
}

impl ButtonEdge {
    /// Creates a detector that treats the button as released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current level; true only on a released-to-pressed change.
    pub fn rising(&mut self, level: bool) -> bool {
        let rose = level && !self.previous;
        self.previous = level;
        rose
    }
}

/// Raw sample and button collaborator.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource: Send {
    /// Latest snapshot. Must not block.
    fn read(&mut self) -> Result<RawInput>;
}

/// Input source backed by an evdev reader thread.
#[derive(Debug)]
pub struct EvdevInputSource {
    rx: watch::Receiver<RawInput>,
    reader: Option<JoinHandle<()>>,
}

impl EvdevInputSource {
    /// Moves `controller` onto a reader thread and returns the consuming end.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the thread cannot be spawned.
    pub fn spawn(controller: DualSenseController) -> Result<Self> {
        let (tx, rx) = watch::channel(RawInput::default());
        let reader = std::thread::Builder::new()
            .name("evdev-reader".to_string())
            .spawn(move || read_loop(controller, tx))?;
        Ok(Self {
            rx,
            reader: Some(reader),
        })
    }

    /// Wraps an existing snapshot channel (no reader thread).
    #[must_use]
    pub fn from_receiver(rx: watch::Receiver<RawInput>) -> Self {
        Self { rx, reader: None }
    }

    /// True while the reader thread is alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.reader
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(true)
    }
}

impl InputSource for EvdevInputSource {
    fn read(&mut self) -> Result<RawInput> {
        if self.rx.has_changed().is_err() {
            return Err(DualStickError::Controller(
                "input device disconnected".to_string(),
            ));
        }
        Ok(*self.rx.borrow_and_update())
    }
}

fn read_loop(mut controller: DualSenseController, tx: watch::Sender<RawInput>) {
    info!("Reading input from {}", controller.device_path());
    let mut mapper = InputEventMapper::new();
    loop {
        match controller.fetch_events() {
            Ok(events) => {
                for event in events {
                    mapper.process_event(&event);
                }
            }
            Err(e) => {
                warn!("Input reader stopped: {}", e);
                return;
            }
        }
        if tx.send(*mapper.state()).is_err() {
            // Sample loop has gone away
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_at_rest() {
        let input = RawInput::default();
        assert_eq!(input.left_raw, 2048);
        assert_eq!(input.right_raw, 2048);
        assert!(!input.recalibrate && !input.left_boost && !input.right_boost);
    }

    #[test]
    fn test_button_edge_ignores_held_level() {
        let mut edge = ButtonEdge::new();
        let levels = [false, true, true, true, false, false, true];
        let edges: Vec<bool> = levels.iter().map(|&l| edge.rising(l)).collect();
        assert_eq!(edges, vec![false, true, false, false, false, false, true]);
    }

    #[test]
    fn test_watch_source_returns_latest_snapshot() {
        let (tx, rx) = watch::channel(RawInput::default());
        let mut source = EvdevInputSource::from_receiver(rx);
        assert_eq!(source.read().unwrap(), RawInput::default());

        tx.send(RawInput::sticks(10, 20)).unwrap();
        tx.send(RawInput::sticks(30, 40)).unwrap();
        assert_eq!(source.read().unwrap(), RawInput::sticks(30, 40));
        // Unchanged snapshots are re-read
        assert_eq!(source.read().unwrap(), RawInput::sticks(30, 40));
        assert!(source.is_connected());
    }

    #[test]
    fn test_watch_source_reports_disconnect() {
        let (tx, rx) = watch::channel(RawInput::default());
        let mut source = EvdevInputSource::from_receiver(rx);
        drop(tx);
        match source.read() {
            Err(DualStickError::Controller(msg)) => assert!(msg.contains("disconnected")),
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }
}
