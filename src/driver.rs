//! # Sample Loop Driver
//!
//! Ties calibration, mapping and the collaborators together, one tick at a
//! time.
//!
//! ## Per-Tick Flow
//!
//! 1. A rising edge on the recalibrate button restarts calibration and ends
//!    the tick.
//! 2. In calibration mode, exactly one phase step runs.
//! 3. In control mode, each axis is mapped with the scale selected by its
//!    boost button on this tick.
//!
//! [`Controller::tick`] is synchronous and returns a [`TickReport`]. The
//! [`Runner`] hands that report to the tone, display, serial and telemetry
//! collaborators.
//!
//! ## Usage
//!
//! ```
//! use std::time::Instant;
//! use dualstick_cal::calibration::{CalibrationSettings, ControlMode};
//! use dualstick_cal::controller::RawInput;
//! use dualstick_cal::driver::Controller;
//! use dualstick_cal::mapper::MappingSettings;
//!
//! let mut controller = Controller::new(CalibrationSettings::default(), MappingSettings::default());
//! let start = Instant::now();
//!
//! let report = controller.tick(&RawInput::sticks(0, 0), start);
//! assert!(report.command.is_none());
//! assert_ne!(controller.mode(), ControlMode::Control);
//! ```

use std::future::Future;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::calibration::{
    CalibrationPhase, CalibrationSettings, CalibrationState, ControlMode,
};
use crate::controller::{ButtonEdge, InputSource, RawInput};
use crate::display::{AxisBounds, DisplayFrame, DisplaySink};
use crate::error::Result;
use crate::mapper::{CommandMapper, CommandPair, MappingSettings};
use crate::serial::CommandSerial;
use crate::telemetry::TelemetryLogger;
use crate::tick::TickFlag;
use crate::tone::{play_cue, ToneCue, ToneSink};

/// Number of ticks between status log messages (5 s at 100 Hz)
pub const LOG_INTERVAL_TICKS: u64 = 500;

/// Everything the collaborators need from one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Cue to play, if this tick caused a transition.
    pub cue: Option<ToneCue>,
    /// Screen content for this tick.
    pub frame: DisplayFrame,
    /// Commands to send; only present in control mode.
    pub command: Option<CommandPair>,
}

/// Calibration state plus command mapping for both axes.
#[derive(Debug, Clone)]
pub struct Controller {
    state: CalibrationState,
    mapper: CommandMapper,
    recalibrate: ButtonEdge,
}

impl Controller {
    /// Creates a controller in `Calibration/FullRange`.
    #[must_use]
    pub fn new(calibration: CalibrationSettings, mapping: MappingSettings) -> Self {
        Self {
            state: CalibrationState::new(calibration),
            mapper: CommandMapper::new(mapping),
            recalibrate: ButtonEdge::new(),
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.state.mode()
    }

    /// Calibration state for both axes.
    #[must_use]
    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Command mapper in use.
    #[must_use]
    pub fn mapper(&self) -> &CommandMapper {
        &self.mapper
    }

    /// Runs one tick.
    pub fn tick(&mut self, input: &RawInput, now: Instant) -> TickReport {
        if self.recalibrate.rising(input.recalibrate) {
            let cue = self.state.recalibrate();
            return TickReport {
                cue: Some(cue),
                frame: self.full_range_frame(input, false),
                command: None,
            };
        }

        match self.state.mode() {
            ControlMode::Calibration(CalibrationPhase::FullRange) => {
                let step = self
                    .state
                    .step_full_range(input.left_raw, input.right_raw, now);
                TickReport {
                    cue: step.cue,
                    frame: self.full_range_frame(input, step.ready_to_switch),
                    command: None,
                }
            }
            ControlMode::Calibration(CalibrationPhase::ZeroCenter) => {
                let step = self
                    .state
                    .step_zero_center(input.left_raw, input.right_raw, now);
                TickReport {
                    cue: step.cue,
                    frame: DisplayFrame::ZeroCenter {
                        left_raw: input.left_raw,
                        right_raw: input.right_raw,
                        left_span: self.state.left_window().span(),
                        right_span: self.state.right_window().span(),
                        stable: step.ready_to_switch,
                    },
                    command: None,
                }
            }
            ControlMode::Control => {
                let command = CommandPair {
                    left: self
                        .mapper
                        .map(input.left_raw, self.state.left(), input.left_boost),
                    right: self
                        .mapper
                        .map(input.right_raw, self.state.right(), input.right_boost),
                };
                TickReport {
                    cue: None,
                    frame: DisplayFrame::Control {
                        left: command.left,
                        right: command.right,
                        left_boost: input.left_boost,
                        right_boost: input.right_boost,
                    },
                    command: Some(command),
                }
            }
        }
    }

    fn full_range_frame(&self, input: &RawInput, range_ok: bool) -> DisplayFrame {
        DisplayFrame::FullRange {
            left_raw: input.left_raw,
            right_raw: input.right_raw,
            left: AxisBounds::from(self.state.left()),
            right: AxisBounds::from(self.state.right()),
            range_ok,
        }
    }
}

/// Owns the [`Controller`] and drives its collaborators.
pub struct Runner {
    controller: Controller,
    input: Box<dyn InputSource>,
    tones: Box<dyn ToneSink>,
    display: Box<dyn DisplaySink>,
    serial: CommandSerial,
    telemetry: Option<TelemetryLogger>,
    ticks: u64,
    send_failures: u64,
    last_command: Option<CommandPair>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("controller", &self.controller)
            .field("serial", &self.serial)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(
        controller: Controller,
        input: Box<dyn InputSource>,
        tones: Box<dyn ToneSink>,
        display: Box<dyn DisplaySink>,
        serial: CommandSerial,
        telemetry: Option<TelemetryLogger>,
    ) -> Self {
        Self {
            controller,
            input,
            tones,
            display,
            serial,
            telemetry,
            ticks: 0,
            send_failures: 0,
            last_command: None,
        }
    }

    /// The wrapped controller.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The serial command writer.
    pub fn serial(&self) -> &CommandSerial {
        &self.serial
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Command lines that could not be written.
    pub fn send_failures(&self) -> u64 {
        self.send_failures
    }

    /// Plays the boot cue for entering calibration.
    pub async fn play_startup(&mut self) {
        self.play(ToneCue::Startup).await;
    }

    async fn play(&mut self, cue: ToneCue) {
        debug!(?cue, "Playing cue");
        if let Err(e) = play_cue(self.tones.as_mut(), cue).await {
            warn!("Failed to play {:?}: {}", cue, e);
        }
    }

    /// Reads input, runs one tick and dispatches its report.
    ///
    /// Collaborator output failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the input source's error (e.g. the device disconnected).
    pub async fn run_tick(&mut self, now: Instant) -> Result<TickReport> {
        let input = self.input.read()?;
        let report = self.controller.tick(&input, now);
        self.ticks += 1;

        if let Some(cue) = report.cue {
            self.play(cue).await;
        }

        if let Err(e) = self.display.show(&report.frame, now) {
            warn!("Display update failed: {}", e);
        }

        if let Some(command) = report.command {
            if let Err(e) = self.serial.send(&command).await {
                self.send_failures += 1;
                // First failure, then once per status interval
                if self.send_failures == 1 || self.send_failures % LOG_INTERVAL_TICKS == 0 {
                    warn!(failures = self.send_failures, "Failed to send command: {}", e);
                } else {
                    debug!("Failed to send command: {}", e);
                }
            }
            if let Some(telemetry) = self.telemetry.as_mut() {
                if let Err(e) = telemetry.record(&command, input.left_boost, input.right_boost, now) {
                    warn!("Failed to record command: {}", e);
                }
            }
            self.last_command = Some(command);
        }

        Ok(report)
    }

    /// Runs one tick per observed signal on `flag` until `shutdown` resolves.
    ///
    /// Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// Stops at the first input error and returns it.
    pub async fn run<F>(&mut self, flag: &TickFlag, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut last_log_ticks = self.ticks;

        loop {
            tokio::select! {
                biased;

                _ = flag.wait() => {
                    self.run_tick(Instant::now()).await?;

                    if self.ticks - last_log_ticks >= LOG_INTERVAL_TICKS {
                        self.log_status();
                        last_log_ticks = self.ticks;
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutting down after {} ticks", self.ticks);
                    break;
                }
            }
        }

        Ok(self.ticks)
    }

    fn log_status(&self) {
        match (self.controller.mode(), self.last_command) {
            (ControlMode::Control, Some(command)) => info!(
                ticks = self.ticks,
                lines_sent = self.serial.lines_sent(),
                send_failures = self.send_failures,
                "Control: {}",
                command
            ),
            (mode, _) => info!(ticks = self.ticks, "Waiting in {}", mode.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::StickCalibration;
    use crate::controller::input::MockInputSource;
    use crate::display::NullDisplay;
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::tone::LogToneSink;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(10);

    fn default_controller() -> Controller {
        Controller::new(CalibrationSettings::default(), MappingSettings::default())
    }

    /// Sweeps both sticks end to end, then rests them at `rest`, until the
    /// controller reaches control mode. Returns the next tick time.
    fn calibrate(controller: &mut Controller, start: Instant, rest: u16) -> Instant {
        let mut now = start;
        let mut i = 0u32;
        while controller.mode() == ControlMode::Calibration(CalibrationPhase::FullRange) {
            let raw = if i % 2 == 0 { 0 } else { 4095 };
            controller.tick(&RawInput::sticks(raw, raw), now);
            now += TICK;
            i += 1;
            assert!(i < 1000, "full-range phase never completed");
        }
        while controller.mode() != ControlMode::Control {
            controller.tick(&RawInput::sticks(rest, rest), now);
            now += TICK;
            i += 1;
            assert!(i < 2000, "zero-center phase never completed");
        }
        now
    }

    // ==================== Calibration Flow Tests ====================

    #[test]
    fn test_no_commands_while_calibrating() {
        let mut controller = default_controller();
        let start = Instant::now();
        for i in 0..20u32 {
            let report = controller.tick(&RawInput::sticks(0, 4095), start + TICK * i);
            assert!(report.command.is_none());
            assert!(matches!(report.frame, DisplayFrame::FullRange { .. }));
        }
    }

    #[test]
    fn test_sweep_then_rest_calibrates_center() {
        let mut controller = default_controller();
        let now = calibrate(&mut controller, Instant::now(), 2048);

        let left = controller.state().left();
        assert!(left.ready());
        assert_eq!(left.min(), 0);
        assert_eq!(left.max(), 4095);
        assert_eq!(left.center(), 2048);
        assert_eq!(controller.state().right().center(), 2048);

        let rest = controller.tick(&RawInput::sticks(2048, 2048), now);
        assert_eq!(rest.command, Some(CommandPair { left: 0, right: 0 }));

        let high = controller.tick(&RawInput::sticks(4095, 4095), now + TICK);
        assert_eq!(high.command, Some(CommandPair { left: -1000, right: -1000 }));

        let low = controller.tick(&RawInput::sticks(0, 0), now + TICK * 2);
        assert_eq!(low.command, Some(CommandPair { left: 1000, right: 1000 }));
    }

    #[test]
    fn test_transition_cues_in_order() {
        let mut controller = default_controller();
        let start = Instant::now();
        let mut cues = Vec::new();
        let mut now = start;

        for i in 0..200u32 {
            let raw = if i % 2 == 0 { 0 } else { 4095 };
            if let Some(cue) = controller.tick(&RawInput::sticks(raw, raw), now).cue {
                cues.push(cue);
            }
            now += TICK;
        }
        for _ in 0..200 {
            if let Some(cue) = controller.tick(&RawInput::sticks(2048, 2048), now).cue {
                cues.push(cue);
            }
            now += TICK;
        }

        assert_eq!(cues, vec![ToneCue::RangeCaptured, ToneCue::CalibrationComplete]);
        assert_eq!(controller.mode(), ControlMode::Control);
    }

    #[test]
    fn test_zero_center_frame_reports_spans() {
        let mut controller = default_controller();
        let start = Instant::now();
        let mut now = start;
        let mut i = 0u32;
        while controller.mode() == ControlMode::Calibration(CalibrationPhase::FullRange) {
            let raw = if i % 2 == 0 { 0 } else { 4095 };
            controller.tick(&RawInput::sticks(raw, raw), now);
            now += TICK;
            i += 1;
        }

        let report = controller.tick(&RawInput::sticks(2000, 2100), now);
        match report.frame {
            DisplayFrame::ZeroCenter { left_raw, right_raw, left_span, right_span, stable } => {
                assert_eq!(left_raw, 2000);
                assert_eq!(right_raw, 2100);
                assert_eq!(left_span, 0);
                assert_eq!(right_span, 0);
                assert!(stable);
            }
            other => panic!("Expected ZeroCenter frame, got: {:?}", other),
        }
    }

    // ==================== Control Mode Tests ====================

    #[test]
    fn test_boost_is_per_tick_and_per_axis() {
        let mut controller = default_controller();
        let now = calibrate(&mut controller, Instant::now(), 2048);

        let boosted = RawInput {
            left_boost: true,
            ..RawInput::sticks(0, 0)
        };
        let report = controller.tick(&boosted, now);
        assert_eq!(report.command, Some(CommandPair { left: 2000, right: 1000 }));
        assert_eq!(
            report.frame,
            DisplayFrame::Control { left: 2000, right: 1000, left_boost: true, right_boost: false }
        );

        // Boost released: back to normal scale immediately
        let report = controller.tick(&RawInput::sticks(0, 0), now + TICK);
        assert_eq!(report.command, Some(CommandPair { left: 1000, right: 1000 }));
    }

    #[test]
    fn test_deadzone_near_center() {
        let mut controller = default_controller();
        let now = calibrate(&mut controller, Instant::now(), 2048);

        let report = controller.tick(&RawInput::sticks(2100, 1990), now);
        assert_eq!(report.command, Some(CommandPair { left: 0, right: 0 }));
    }

    // ==================== Recalibration Tests ====================

    #[test]
    fn test_recalibrate_from_control() {
        let mut controller = default_controller();
        let now = calibrate(&mut controller, Instant::now(), 2048);

        let press = RawInput {
            recalibrate: true,
            ..RawInput::sticks(0, 0)
        };
        let report = controller.tick(&press, now);
        assert_eq!(report.cue, Some(ToneCue::Recalibrating));
        assert!(report.command.is_none());
        assert_eq!(
            controller.mode(),
            ControlMode::Calibration(CalibrationPhase::FullRange)
        );
        assert_eq!(*controller.state().left(), StickCalibration::new());
        assert!(!controller.state().right().ready());
        for raw in [0, 2048, 4095] {
            assert_eq!(controller.mapper().map(raw, controller.state().left(), true), 0);
        }

        // The press tick does not feed the full-range phase
        match report.frame {
            DisplayFrame::FullRange { left, range_ok, .. } => {
                assert_eq!(left, AxisBounds { min: u16::MAX, max: 0 });
                assert!(!range_ok);
            }
            other => panic!("Expected FullRange frame, got: {:?}", other),
        }
    }

    #[test]
    fn test_held_recalibrate_button_fires_once() {
        let mut controller = default_controller();
        let start = Instant::now();
        let held = RawInput {
            recalibrate: true,
            ..RawInput::sticks(0, 4095)
        };

        let first = controller.tick(&held, start);
        assert_eq!(first.cue, Some(ToneCue::Recalibrating));

        for i in 1..10u32 {
            let report = controller.tick(&held, start + TICK * i);
            assert!(report.cue.is_none());
        }
        assert!(controller.state().left().has_samples());
    }

    #[test]
    fn test_recalibrate_during_zero_center() {
        let mut controller = default_controller();
        let start = Instant::now();
        let mut now = start;
        let mut i = 0u32;
        while controller.mode() == ControlMode::Calibration(CalibrationPhase::FullRange) {
            let raw = if i % 2 == 0 { 0 } else { 4095 };
            controller.tick(&RawInput::sticks(raw, raw), now);
            now += TICK;
            i += 1;
        }
        controller.tick(&RawInput::sticks(2048, 2048), now);

        let press = RawInput {
            recalibrate: true,
            ..RawInput::sticks(2048, 2048)
        };
        controller.tick(&press, now + TICK);
        assert_eq!(
            controller.mode(),
            ControlMode::Calibration(CalibrationPhase::FullRange)
        );
        assert!(controller.state().left_window().is_empty());
        assert!(controller.state().center_hold().since().is_none());
    }

    // ==================== Runner Tests ====================

    fn quick_settings() -> CalibrationSettings {
        CalibrationSettings {
            hold: Duration::from_millis(20),
            ..CalibrationSettings::default()
        }
    }

    fn scripted_input(script: Vec<RawInput>) -> MockInputSource {
        let mut inputs = script.into_iter();
        let mut source = MockInputSource::new();
        source
            .expect_read()
            .returning(move || Ok(inputs.next().unwrap_or_default()));
        source
    }

    fn runner_with(source: MockInputSource, port: &MockSerialPort) -> Runner {
        Runner::new(
            Controller::new(quick_settings(), MappingSettings::default()),
            Box::new(source),
            Box::new(LogToneSink::new(true)),
            Box::new(NullDisplay),
            CommandSerial::with_port(Box::new(port.clone()), "mock"),
            None,
        )
    }

    fn calibration_script() -> Vec<RawInput> {
        let mut script: Vec<RawInput> = (0..6)
            .map(|i| if i % 2 == 0 { RawInput::sticks(0, 0) } else { RawInput::sticks(4095, 4095) })
            .collect();
        script.extend(std::iter::repeat(RawInput::sticks(2048, 2048)).take(6));
        script
    }

    #[tokio::test]
    async fn test_runner_writes_lines_only_in_control() {
        let port = MockSerialPort::new();
        let mut script = calibration_script();
        script.push(RawInput::sticks(4095, 0));
        let steps = script.len() as u32;
        let mut runner = runner_with(scripted_input(script), &port);

        let start = Instant::now();
        let mut reports = Vec::new();
        for i in 0..steps {
            reports.push(runner.run_tick(start + TICK * i).await.unwrap());
        }

        assert_eq!(runner.controller().mode(), ControlMode::Control);
        let commands: Vec<_> = reports.iter().filter_map(|r| r.command).collect();
        assert_eq!(commands.last(), Some(&CommandPair { left: -1000, right: 1000 }));
        assert_eq!(runner.serial().lines_sent(), commands.len() as u64);
        assert!(port.written_text().ends_with("L:-1000,R:1000\n"));
        assert_eq!(runner.ticks(), u64::from(steps));
        assert_eq!(runner.send_failures(), 0);
    }

    #[tokio::test]
    async fn test_runner_propagates_input_error() {
        let port = MockSerialPort::new();
        let mut source = MockInputSource::new();
        source.expect_read().returning(|| {
            Err(crate::error::DualStickError::Controller("input device disconnected".to_string()))
        });
        let mut runner = runner_with(source, &port);

        assert!(runner.run_tick(Instant::now()).await.is_err());
        assert_eq!(runner.ticks(), 0);
    }

    #[tokio::test]
    async fn test_runner_survives_serial_failure() {
        let port = MockSerialPort::new();
        port.set_write_error(std::io::ErrorKind::BrokenPipe);
        let mut script = calibration_script();
        script.push(RawInput::sticks(0, 0));
        let steps = script.len() as u32;
        let mut runner = runner_with(scripted_input(script), &port);

        let start = Instant::now();
        let mut commands = 0u64;
        for i in 0..steps {
            if runner.run_tick(start + TICK * i).await.unwrap().command.is_some() {
                commands += 1;
            }
        }
        assert_eq!(runner.controller().mode(), ControlMode::Control);
        assert_eq!(runner.serial().lines_sent(), 0);
        assert!(commands > 0);
        assert_eq!(runner.send_failures(), commands);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_one_tick_per_signal() {
        let port = MockSerialPort::new();
        let mut runner = runner_with(scripted_input(vec![]), &port);
        let flag = TickFlag::new();

        flag.signal();
        flag.signal();
        let ticks = runner
            .run(&flag, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(ticks, 1);
    }

    #[test]
    fn test_log_interval_constant() {
        // At 100Hz, 500 ticks = 5 seconds
        let millis = LOG_INTERVAL_TICKS * TICK.as_millis() as u64;
        assert_eq!(millis, 5000);
    }
}
