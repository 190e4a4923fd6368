//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::SimFrame;
use crate::invariants::check_program;

use crossbeam::channel::Receiver;
use gallop_core::{ProgramConfig, RaceEvent, RaceProgram, SessionId};
use gallop_env::{drive, FrameContext, FrameDriven};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Virtual frames per second
    pub fps: u32,

    /// Frames delivered before a run is declared stuck
    pub max_frames: u64,

    /// Trials for statistical scenarios
    pub trials: usize,

    /// Record every Nth frame when recording is on
    pub export_interval: u64,

    /// Engine configuration
    pub program: ProgramConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fps: 60,
            max_frames: 100_000,
            trials: 200,
            export_interval: 10,
            program: ProgramConfig::default(),
        }
    }
}

/// A program wrapped so every delivered frame is followed by an invariant check.
///
/// Stops asking for frames at the first violation.
pub struct CheckedProgram<'a> {
    program: &'a mut RaceProgram,
    violation: Option<SimError>,
    checks: u64,
}

impl<'a> CheckedProgram<'a> {
    pub fn new(program: &'a mut RaceProgram) -> Self {
        Self {
            program,
            violation: None,
            checks: 0,
        }
    }

    /// Number of frames checked.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Returns the first violation, if any.
    pub fn finish(self) -> Result<u64, SimError> {
        match self.violation {
            Some(err) => Err(err),
            None => Ok(self.checks),
        }
    }
}

impl FrameDriven for CheckedProgram<'_> {
    fn wants_frame(&self) -> bool {
        self.violation.is_none() && self.program.wants_frame()
    }

    fn on_frame(&mut self, timestamp: Duration) {
        self.program.on_frame(timestamp);
        self.checks += 1;
        if let Err(err) = check_program(self.program) {
            self.violation = Some(err);
        }
    }
}

/// The SimWorld - one race program on a virtual clock.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    program: RaceProgram,

    /// Subscription to the program's change notifications
    events: Receiver<RaceEvent>,

    /// Every event received so far
    event_log: Vec<RaceEvent>,

    /// Events not yet attached to a recorded frame
    unrecorded_events: Vec<RaceEvent>,

    /// Frames delivered to the program
    frame_count: u64,

    /// Frames delivered while the animated session was paused
    paused_frames: u64,

    /// Invariant checks performed
    invariant_checks: u64,

    /// Recorded frames, if recording is on
    recorded: Option<Vec<SimFrame>>,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let mut program = RaceProgram::with_seed(config.program.clone(), config.seed)?;
        let events = program.subscribe();
        let context = SimContext::shared(config.seed, config.fps);
        debug!("SimWorld created (seed={}, fps={})", context.seed(), config.fps);

        Ok(Self {
            config,
            context,
            program,
            events,
            event_log: Vec::new(),
            unrecorded_events: Vec::new(),
            frame_count: 0,
            paused_frames: 0,
            invariant_checks: 0,
            recorded: None,
        })
    }

    /// Starts sampling frames for export.
    pub fn enable_recording(&mut self) {
        self.recorded.get_or_insert_with(Vec::new);
    }

    /// Takes the frames recorded so far.
    pub fn take_frames(&mut self) -> Vec<SimFrame> {
        self.recorded.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn program(&self) -> &RaceProgram {
        &self.program
    }

    /// Mutable access for user-intent calls (pause, toggle, stop...).
    ///
    /// Call `check` afterwards to validate the resulting state.
    pub fn program_mut(&mut self) -> &mut RaceProgram {
        &mut self.program
    }

    /// Generates a program stamped with the virtual wall clock.
    pub fn generate_program(&mut self) -> Result<Vec<SessionId>, SimError> {
        let created_at = self.context.system_time();
        Ok(self.program.generate_program_at(created_at)?)
    }

    /// Drains pending events and runs the invariant checker.
    pub fn check(&mut self) -> Result<(), SimError> {
        self.drain_events();
        check_program(&self.program)?;
        self.invariant_checks += 1;
        Ok(())
    }

    /// Advances the clock one frame and delivers it if the program wants it.
    ///
    /// Returns whether a frame was delivered.
    pub fn tick(&mut self) -> Result<bool, SimError> {
        let timestamp = self.context.step();
        if !self.program.wants_frame() {
            return Ok(false);
        }

        if self.program.active_race_session().map_or(false, |s| s.is_paused()) {
            self.paused_frames += 1;
        }

        self.program.on_frame(timestamp);
        self.frame_count += 1;
        self.check()?;
        self.record();
        Ok(true)
    }

    /// Runs `count` frame intervals; returns how many frames were delivered.
    pub fn run_frames(&mut self, count: u64) -> Result<u64, SimError> {
        let mut delivered = 0;
        for _ in 0..count {
            if self.tick()? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Delivers frames until the program stops asking for them.
    pub fn run_until_idle(&mut self) -> Result<u64, SimError> {
        let mut delivered = 0;
        while self.program.wants_frame() {
            if delivered >= self.config.max_frames {
                return Err(SimError::FrameBudgetExhausted(delivered));
            }
            self.tick()?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Same as `run_until_idle`, through the async host driver.
    pub async fn drive_until_idle(&mut self) -> Result<u64, SimError> {
        let context = Arc::clone(&self.context);
        let mut checked = CheckedProgram::new(&mut self.program);
        let frames = drive(context.as_ref(), &mut checked, self.config.max_frames).await?;
        let checks = checked.finish()?;

        self.frame_count += frames;
        self.invariant_checks += checks;
        self.drain_events();
        Ok(frames)
    }

    fn drain_events(&mut self) {
        for event in self.events.try_iter() {
            self.unrecorded_events.push(event.clone());
            self.event_log.push(event);
        }
    }

    fn record(&mut self) {
        let Some(frames) = self.recorded.as_mut() else {
            self.unrecorded_events.clear();
            return;
        };

        let interval = self.config.export_interval.max(1);
        if self.frame_count % interval == 0 || !self.unrecorded_events.is_empty() {
            let time_sec = self.context.now().as_secs_f64();
            frames.push(SimFrame::capture(time_sec, &self.program, &self.unrecorded_events));
            self.unrecorded_events.clear();
        }
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn paused_frames(&self) -> u64 {
        self.paused_frames
    }

    pub fn invariant_checks(&self) -> u64 {
        self.invariant_checks
    }

    /// Every event received so far.
    pub fn events(&self) -> &[RaceEvent] {
        &self.event_log
    }
}
