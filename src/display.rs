//! # Display Module
//!
//! Status screens for calibration and control.
//!
//! The controller hands a complete [`DisplayFrame`] to the display on every
//! tick. Anything frame-to-frame (refresh throttling, skipping unchanged
//! frames) belongs to the renderer, never to the core.
//!
//! ## Screens
//!
//! | Mode | Content |
//! |------|---------|
//! | Full range | raw values, observed min/max per axis, "range ok" hint |
//! | Zero center | raw values, window span per axis, "center ok" hint |
//! | Control | both commands with boost marker, two vertical bars |

use std::io::Write;
use std::time::{Duration, Instant};

use crate::calibration::StickCalibration;
use crate::error::Result;
use crate::mapper::{BOOST_SCALE, NORMAL_SCALE};

/// Minimum time between two redraws.
pub const DEFAULT_MIN_REFRESH: Duration = Duration::from_millis(100);

/// Rows used by the text bar graph (including the frame).
const BAR_ROWS: i32 = 11;

/// Observed bounds of one axis during the full-range phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBounds {
    /// Lowest raw value seen (`u16::MAX` before the first sample).
    pub min: u16,
    /// Highest raw value seen (0 before the first sample).
    pub max: u16,
}

impl From<&StickCalibration> for AxisBounds {
    fn from(cal: &StickCalibration) -> Self {
        Self {
            min: cal.min(),
            max: cal.max(),
        }
    }
}

/// Everything a display needs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFrame {
    /// Full-range calibration progress.
    FullRange {
        left_raw: u16,
        right_raw: u16,
        left: AxisBounds,
        right: AxisBounds,
        range_ok: bool,
    },
    /// Zero-center calibration progress.
    ZeroCenter {
        left_raw: u16,
        right_raw: u16,
        left_span: u16,
        right_span: u16,
        stable: bool,
    },
    /// Live commands.
    Control {
        left: i16,
        right: i16,
        left_boost: bool,
        right_boost: bool,
    },
}

impl DisplayFrame {
    /// Screen title.
    #[must_use]
    pub fn phase_name(&self) -> &'static str {
        match self {
            DisplayFrame::FullRange { .. } | DisplayFrame::ZeroCenter { .. } => "CALIBRATION",
            DisplayFrame::Control { .. } => "CONTROL",
        }
    }

    /// Renders the frame as text lines.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        match *self {
            DisplayFrame::FullRange {
                left_raw,
                right_raw,
                left,
                right,
                range_ok,
            } => {
                let mut lines = vec![
                    self.phase_name().to_string(),
                    "Rotate sticks fully".to_string(),
                    String::new(),
                    format!("L raw: {:4}", left_raw),
                    format!("R raw: {:4}", right_raw),
                    format!("L {}", bounds_text(left)),
                    format!("R {}", bounds_text(right)),
                ];
                if range_ok {
                    lines.push("Range ok, release sticks".to_string());
                }
                lines
            }
            DisplayFrame::ZeroCenter {
                left_raw,
                right_raw,
                left_span,
                right_span,
                stable,
            } => {
                let mut lines = vec![
                    self.phase_name().to_string(),
                    "Release sticks".to_string(),
                    "Hold still 0.5s".to_string(),
                    String::new(),
                    format!("L raw:  {:4}", left_raw),
                    format!("R raw:  {:4}", right_raw),
                    format!("L span: {:4}", left_span),
                    format!("R span: {:4}", right_span),
                ];
                if stable {
                    lines.push("Center ok, switching...".to_string());
                }
                lines
            }
            DisplayFrame::Control {
                left,
                right,
                left_boost,
                right_boost,
            } => {
                let mut lines = vec![
                    self.phase_name().to_string(),
                    format!("L:{:+05} {}", left, boost_label(left_boost)),
                    format!("R:{:+05} {}", right, boost_label(right_boost)),
                ];
                lines.extend(render_bars(
                    left,
                    scale_for(left_boost),
                    right,
                    scale_for(right_boost),
                ));
                lines
            }
        }
    }
}

fn bounds_text(bounds: AxisBounds) -> String {
    if bounds.min > bounds.max {
        "min:---- max:----".to_string()
    } else {
        format!("min:{:4} max:{:4}", bounds.min, bounds.max)
    }
}

fn boost_label(boost: bool) -> &'static str {
    if boost {
        "x2"
    } else {
        "x1"
    }
}

fn scale_for(boost: bool) -> i16 {
    if boost {
        BOOST_SCALE
    } else {
        NORMAL_SCALE
    }
}

/// Outer rectangle of a vertical bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarArea {
    /// Left edge, including the frame.
    pub x: i32,
    /// Top edge, including the frame.
    pub y: i32,
    /// Outer width, including the 1-unit frame on each side.
    pub width: i32,
    /// Outer height, including the 1-unit frame on each side.
    pub height: i32,
}

/// Filled part of a vertical bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarRect {
    /// Left edge of the fill.
    pub x: i32,
    /// Top edge of the fill.
    pub y: i32,
    /// Fill width.
    pub width: i32,
    /// Fill height, always at least 1.
    pub height: i32,
}

/// Computes the filled rectangle for `value` inside `area`.
///
/// Positive values grow up from the middle line, negative values grow down.
/// Returns `None` for a degenerate area, a non-positive scale, or a bar too
/// short to draw.
///
/// # Examples
///
/// ```
/// use dualstick_cal::display::{bar_rect, BarArea};
///
/// let area = BarArea { x: 0, y: 0, width: 10, height: 102 };
///
/// let full_up = bar_rect(1000, 1000, area).unwrap();
/// assert_eq!((full_up.y, full_up.height), (1, 50));
///
/// let half_down = bar_rect(-500, 1000, area).unwrap();
/// assert_eq!((half_down.y, half_down.height), (52, 25));
///
/// assert!(bar_rect(0, 1000, area).is_none());
/// ```
#[must_use]
pub fn bar_rect(value: i16, scale: i16, area: BarArea) -> Option<BarRect> {
    if scale <= 0 || area.width <= 2 || area.height <= 2 {
        return None;
    }

    let scale = i32::from(scale);
    let clamped = i32::from(value).clamp(-scale, scale);

    let middle = area.y + area.height / 2;
    let half_span = (area.height - 2) / 2;
    let length = clamped.abs() * half_span / scale;
    if length <= 0 {
        return None;
    }

    let y = if clamped >= 0 { middle - length } else { middle + 1 };
    Some(BarRect {
        x: area.x + 1,
        y,
        width: area.width - 2,
        height: length,
    })
}

fn bar_cell(rect: Option<BarRect>, row: i32, middle: i32) -> char {
    if let Some(rect) = rect {
        if row >= rect.y && row < rect.y + rect.height {
            return '#';
        }
    }
    if row == middle {
        '-'
    } else {
        ' '
    }
}

fn render_bars(left: i16, left_scale: i16, right: i16, right_scale: i16) -> Vec<String> {
    let area = BarArea {
        x: 0,
        y: 0,
        width: 3,
        height: BAR_ROWS,
    };
    let left_rect = bar_rect(left, left_scale, area);
    let right_rect = bar_rect(right, right_scale, area);
    let middle = area.y + area.height / 2;

    (0..BAR_ROWS)
        .map(|row| {
            if row == 0 || row == BAR_ROWS - 1 {
                return "+-+   +-+".to_string();
            }
            format!(
                "|{}|   |{}|",
                bar_cell(left_rect, row, middle),
                bar_cell(right_rect, row, middle)
            )
        })
        .collect()
}

/// Display collaborator.
pub trait DisplaySink: Send {
    /// Offers a frame. Implementations may drop it (rate limit, no change).
    fn show(&mut self, frame: &DisplayFrame, now: Instant) -> Result<()>;
}

/// Display that discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show(&mut self, _frame: &DisplayFrame, _now: Instant) -> Result<()> {
        Ok(())
    }
}

/// Text renderer writing screens to any [`Write`] target.
///
/// Redraws at most once per `min_refresh` and skips frames identical to the
/// last one drawn.
#[derive(Debug)]
pub struct TextDisplay<W: Write + Send> {
    writer: W,
    min_refresh: Duration,
    last_draw: Option<Instant>,
    last_frame: Option<DisplayFrame>,
    frames_drawn: u64,
}

impl<W: Write + Send> TextDisplay<W> {
    /// Creates a renderer over `writer`.
    pub fn new(writer: W, min_refresh: Duration) -> Self {
        Self {
            writer,
            min_refresh,
            last_draw: None,
            last_frame: None,
            frames_drawn: 0,
        }
    }

    /// Number of frames actually written.
    #[must_use]
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Underlying writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> DisplaySink for TextDisplay<W> {
    fn show(&mut self, frame: &DisplayFrame, now: Instant) -> Result<()> {
        if let Some(last) = self.last_draw {
            if now.saturating_duration_since(last) < self.min_refresh {
                return Ok(());
            }
        }
        self.last_draw = Some(now);

        if self.last_frame.as_ref() == Some(frame) {
            return Ok(());
        }

        for line in frame.render() {
            writeln!(self.writer, "{}", line)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;

        self.last_frame = Some(*frame);
        self.frames_drawn += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(left: i16, right: i16) -> DisplayFrame {
        DisplayFrame::Control {
            left,
            right,
            left_boost: false,
            right_boost: true,
        }
    }

    // ==================== Bar Geometry Tests ====================

    #[test]
    fn test_bar_rect_degenerate_area() {
        let thin = BarArea { x: 0, y: 0, width: 2, height: 50 };
        let flat = BarArea { x: 0, y: 0, width: 10, height: 2 };
        assert!(bar_rect(1000, 1000, thin).is_none());
        assert!(bar_rect(1000, 1000, flat).is_none());
    }

    #[test]
    fn test_bar_rect_non_positive_scale() {
        let area = BarArea { x: 0, y: 0, width: 10, height: 50 };
        assert!(bar_rect(100, 0, area).is_none());
        assert!(bar_rect(100, -5, area).is_none());
    }

    #[test]
    fn test_bar_rect_clamps_to_scale() {
        let area = BarArea { x: 4, y: 40, width: 20, height: 82 };
        let over = bar_rect(3000, 1000, area).unwrap();
        let full = bar_rect(1000, 1000, area).unwrap();
        assert_eq!(over, full);
        assert_eq!(full.x, 5);
        assert_eq!(full.width, 18);
        assert_eq!(full.height, 40);
        assert_eq!(full.y, 81 - 40);
    }

    #[test]
    fn test_bar_rect_negative_starts_below_middle() {
        let area = BarArea { x: 0, y: 0, width: 10, height: 22 };
        let rect = bar_rect(-1000, 1000, area).unwrap();
        assert_eq!(rect.y, 12);
        assert_eq!(rect.height, 10);
    }

    // ==================== Rendering Tests ====================

    #[test]
    fn test_full_range_render_without_samples() {
        let frame = DisplayFrame::FullRange {
            left_raw: 2048,
            right_raw: 100,
            left: AxisBounds { min: u16::MAX, max: 0 },
            right: AxisBounds { min: 100, max: 100 },
            range_ok: false,
        };
        let lines = frame.render();
        assert_eq!(lines[0], "CALIBRATION");
        assert!(lines.contains(&"L min:---- max:----".to_string()));
        assert!(lines.contains(&"R min: 100 max: 100".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Range ok")));
    }

    #[test]
    fn test_zero_center_render_shows_hint_when_stable() {
        let frame = DisplayFrame::ZeroCenter {
            left_raw: 2048,
            right_raw: 2050,
            left_span: 3,
            right_span: 12,
            stable: true,
        };
        let lines = frame.render();
        assert!(lines.contains(&"R span:   12".to_string()));
        assert_eq!(lines.last().unwrap(), "Center ok, switching...");
    }

    #[test]
    fn test_control_render_text() {
        let lines = control(-1000, 45).render();
        assert_eq!(lines[0], "CONTROL");
        assert_eq!(lines[1], "L:-1000 x1");
        assert_eq!(lines[2], "R:+0045 x2");
        assert_eq!(lines.len(), 3 + BAR_ROWS as usize);
    }

    #[test]
    fn test_control_bars_grow_in_opposite_directions() {
        let lines = control(1000, -2000).render();
        let bars = &lines[3..];
        // Row 1 is the top inner row: left full up, right empty
        assert_eq!(bars[1], "|#|   | |");
        // Middle row is the zero line for both
        assert_eq!(bars[5], "|-|   |-|");
        // Row 9 is the bottom inner row: right full down
        assert_eq!(bars[9], "| |   |#|");
    }

    // ==================== TextDisplay Tests ====================

    #[test]
    fn test_text_display_rate_limits() {
        let t0 = Instant::now();
        let mut display = TextDisplay::new(Vec::new(), DEFAULT_MIN_REFRESH);

        display.show(&control(100, 100), t0).unwrap();
        display.show(&control(200, 200), t0 + Duration::from_millis(50)).unwrap();
        assert_eq!(display.frames_drawn(), 1);

        display.show(&control(300, 300), t0 + Duration::from_millis(100)).unwrap();
        assert_eq!(display.frames_drawn(), 2);
    }

    #[test]
    fn test_text_display_skips_identical_frames() {
        let t0 = Instant::now();
        let mut display = TextDisplay::new(Vec::new(), DEFAULT_MIN_REFRESH);

        display.show(&control(100, 100), t0).unwrap();
        display.show(&control(100, 100), t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(display.frames_drawn(), 1);

        let text = String::from_utf8(display.writer().clone()).unwrap();
        assert!(text.starts_with("CONTROL\nL:+0100 x1\n"));
    }

    #[test]
    fn test_null_display_accepts_frames() {
        let mut display = NullDisplay;
        assert!(display.show(&control(0, 0), Instant::now()).is_ok());
    }
}
