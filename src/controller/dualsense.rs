//! # DualSense Gamepad Device
//!
//! Detects and opens a PS5 DualSense controller through the Linux evdev
//! interface. Its two vertical stick axes stand in for the analog front end.
//!
//! ## Controller Detection
//!
//! The DualSense controller is identified by:
//! - Vendor ID: 0x054c (Sony)
//! - Product ID: 0x0ce6 (DualSense, both wired and Bluetooth)
//!
//! The kernel driver also creates motion-sensor and touchpad nodes with the
//! same IDs, so the gamepad node is picked by its capabilities: it must
//! report the PS button (`BTN_MODE`) and both stick axes used here
//! (`ABS_Y`, `ABS_RZ`).
//!
//! A device path from the configuration skips detection entirely.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{DualStickError, Result};

/// PS5 DualSense vendor ID (Sony)
const DUALSENSE_VENDOR_ID: u16 = 0x054c;

/// PS5 DualSense product ID (wired and Bluetooth)
const DUALSENSE_PRODUCT_ID: u16 = 0x0ce6;

/// Directory scanned for event devices during detection.
const INPUT_DIR: &str = "/dev/input";

/// Open evdev gamepad handle.
pub struct DualSenseController {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for DualSenseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualSenseController")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl DualSenseController {
    /// Detect and open the first available DualSense controller.
    ///
    /// Scans `/dev/input/event*` in sorted order and matches vendor and
    /// product IDs.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no DualSense controller found
    /// - `Controller`: `/dev/input` missing or unreadable
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dualstick_cal::controller::dualsense::DualSenseController;
    ///
    /// let controller = DualSenseController::open()?;
    /// println!("Connected to controller at: {}", controller.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);

        if !input_dir.exists() {
            return Err(DualStickError::Controller(format!(
                "{} directory not found",
                INPUT_DIR
            )));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| DualStickError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DualStickError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic pick when several controllers are attached
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_device = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_device {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );

                    if !is_dualsense(id.vendor(), id.product()) {
                        continue;
                    }

                    if !is_gamepad_node(has_mode_button(&device), has_stick_axes(&device)) {
                        // Motion sensor and touchpad nodes share the same IDs
                        debug!("Skipping non-gamepad DualSense node {}", path.display());
                        continue;
                    }

                    let device_path = path.to_string_lossy().to_string();
                    info!("Found DualSense controller at: {}", device_path);
                    return Ok(Self {
                        device,
                        device_path,
                    });
                }
                Err(e) => {
                    // Permission denied or similar: try the next device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(DualStickError::ControllerNotFound)
    }

    /// Open a specific event device without vendor matching.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the device cannot be opened.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path).map_err(|e| {
            DualStickError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let device_path = path.to_string_lossy().to_string();
        info!("Opened input device at: {}", device_path);
        Ok(Self {
            device,
            device_path,
        })
    }

    /// Open `path` when non-empty, otherwise auto-detect.
    pub fn open_configured(path: &str) -> Result<Self> {
        if path.is_empty() {
            Self::open()
        } else {
            Self::open_path(path)
        }
    }

    /// The `/dev/input/eventX` path this controller was opened from.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Fetch available input events. Blocks until at least one arrives.
    ///
    /// # Errors
    ///
    /// Returns `Controller` when the read fails (e.g. the device was unplugged).
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = evdev::InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| DualStickError::Controller(format!("Failed to fetch events: {}", e)))
    }

    /// Human-readable device name reported by the kernel.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

fn is_dualsense(vendor: u16, product: u16) -> bool {
    vendor == DUALSENSE_VENDOR_ID && product == DUALSENSE_PRODUCT_ID
}

/// True for the gamepad node, false for motion-sensor or touchpad nodes.
fn is_gamepad_node(has_mode_button: bool, has_stick_axes: bool) -> bool {
    has_mode_button && has_stick_axes
}

fn has_mode_button(device: &Device) -> bool {
    device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_MODE))
        .unwrap_or(false)
}

fn has_stick_axes(device: &Device) -> bool {
    device
        .supported_absolute_axes()
        .map(|axes| axes.contains(AbsoluteAxisType::ABS_Y) && axes.contains(AbsoluteAxisType::ABS_RZ))
        .unwrap_or(false)
}
