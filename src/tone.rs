//! # Tone Feedback
//!
//! Two-tone cues that confirm calibration transitions.
//!
//! | Cue | Sequence |
//! |-----|----------|
//! | Full range captured | 600 Hz 100 ms, 100 ms gap, 600 Hz 100 ms |
//! | Calibration complete | 440 Hz 200 ms, 600 Hz 200 ms |
//! | Recalibrating / startup | 600 Hz 200 ms, 440 Hz 200 ms |
//!
//! The core only decides which cue to play. Producing sound is up to a
//! [`ToneSink`].

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::error::Result;

/// Short beep length for the range-captured cue.
pub const BEEP_DURATION_MS: u64 = 100;

/// Silence between the two range-captured beeps.
pub const BEEP_GAP_MS: u64 = 100;

/// Tone length for the two-note cues.
pub const NOTE_DURATION_MS: u64 = 200;

/// One element of a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneStep {
    /// Emit a tone.
    Tone { frequency_hz: u32, duration_ms: u64 },
    /// Stay silent.
    Gap { duration_ms: u64 },
}

const RANGE_CAPTURED: [ToneStep; 3] = [
    ToneStep::Tone {
        frequency_hz: 600,
        duration_ms: BEEP_DURATION_MS,
    },
    ToneStep::Gap {
        duration_ms: BEEP_GAP_MS,
    },
    ToneStep::Tone {
        frequency_hz: 600,
        duration_ms: BEEP_DURATION_MS,
    },
];

const CALIBRATION_COMPLETE: [ToneStep; 2] = [
    ToneStep::Tone {
        frequency_hz: 440,
        duration_ms: NOTE_DURATION_MS,
    },
    ToneStep::Tone {
        frequency_hz: 600,
        duration_ms: NOTE_DURATION_MS,
    },
];

const RECALIBRATING: [ToneStep; 2] = [
    ToneStep::Tone {
        frequency_hz: 600,
        duration_ms: NOTE_DURATION_MS,
    },
    ToneStep::Tone {
        frequency_hz: 440,
        duration_ms: NOTE_DURATION_MS,
    },
];

/// Audible confirmation emitted on a calibration transition.
///
/// # Examples
///
/// ```
/// use dualstick_cal::tone::{ToneCue, ToneStep};
///
/// let steps = ToneCue::CalibrationComplete.steps();
/// assert_eq!(steps[0], ToneStep::Tone { frequency_hz: 440, duration_ms: 200 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCue {
    /// Played once at boot when calibration is first entered.
    Startup,
    /// Full-range phase finished, zero-center begins.
    RangeCaptured,
    /// Zero-center phase finished, control begins.
    CalibrationComplete,
    /// Recalibration requested.
    Recalibrating,
}

impl ToneCue {
    /// Steps making up this cue, in order.
    #[must_use]
    pub fn steps(&self) -> &'static [ToneStep] {
        match self {
            ToneCue::RangeCaptured => &RANGE_CAPTURED,
            ToneCue::CalibrationComplete => &CALIBRATION_COMPLETE,
            ToneCue::Startup | ToneCue::Recalibrating => &RECALIBRATING,
        }
    }

    /// Total time the cue takes to play.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        let ms: u64 = self
            .steps()
            .iter()
            .map(|step| match step {
                ToneStep::Tone { duration_ms, .. } | ToneStep::Gap { duration_ms } => *duration_ms,
            })
            .sum();
        Duration::from_millis(ms)
    }
}

/// Sound output collaborator.
///
/// Both calls block (await) for their full duration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToneSink: Send {
    /// Emit a tone.
    async fn emit(&mut self, frequency_hz: u32, duration_ms: u64) -> Result<()>;

    /// Stay silent.
    async fn pause(&mut self, duration_ms: u64) -> Result<()>;
}

/// Plays every step of `cue` on `sink`.
pub async fn play_cue(sink: &mut dyn ToneSink, cue: ToneCue) -> Result<()> {
    for step in cue.steps() {
        match *step {
            ToneStep::Tone {
                frequency_hz,
                duration_ms,
            } => sink.emit(frequency_hz, duration_ms).await?,
            ToneStep::Gap { duration_ms } => sink.pause(duration_ms).await?,
        }
    }
    Ok(())
}

/// Host tone sink: logs each tone and waits for its duration.
///
/// A muted sink skips the wait, so cues cost no loop time.
#[derive(Debug, Default)]
pub struct LogToneSink {
    muted: bool,
    tones_emitted: u64,
}

impl LogToneSink {
    /// Creates a sink; `muted` skips both logging and waiting.
    #[must_use]
    pub fn new(muted: bool) -> Self {
        Self {
            muted,
            tones_emitted: 0,
        }
    }

    /// Number of tones emitted so far.
    #[must_use]
    pub fn tones_emitted(&self) -> u64 {
        self.tones_emitted
    }
}

#[async_trait]
impl ToneSink for LogToneSink {
    async fn emit(&mut self, frequency_hz: u32, duration_ms: u64) -> Result<()> {
        self.tones_emitted += 1;
        if self.muted {
            return Ok(());
        }
        info!(frequency_hz, duration_ms, "Beep");
        sleep(Duration::from_millis(duration_ms)).await;
        Ok(())
    }

    async fn pause(&mut self, duration_ms: u64) -> Result<()> {
        if self.muted {
            return Ok(());
        }
        sleep(Duration::from_millis(duration_ms)).await;
        Ok(())
    }
}
