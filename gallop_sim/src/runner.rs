//! Scenario runner - executes simulation scenarios against the engine.

use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use gallop_core::outcome::{calculate_finish_time, resolve_instant};
use gallop_core::{
    Horse, NewHorse, ProgramConfig, RaceError, RaceEvent, RaceRef, RaceState, TransitionError,
};
use gallop_env::{FrameContext, FrameDriven};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Frames delivered to the engine
    pub total_frames: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Sessions completed by the end of the run
    pub sessions_completed: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

impl ScenarioResult {
    fn failed(scenario: ScenarioId, seed: u64, reason: String) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            total_frames: 0,
            final_time_secs: 0.0,
            sessions_completed: 0,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
        }
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Frames delivered while the animated session was paused
    pub paused_frames: u64,

    /// Invariant checks that passed
    pub invariant_checks: u64,

    /// Round-indexed races resolved
    pub rounds_completed: usize,

    /// Change notifications received from the engine
    pub events_received: usize,

    /// Mean finish time of the score-100 horse (condition_bias)
    pub strong_mean_time: f64,

    /// Mean finish time of the score-1 horse (condition_bias)
    pub weak_mean_time: f64,
}

/// Fails the scenario with `msg` unless `condition` holds.
fn ensure(condition: bool, msg: impl FnOnce() -> String) -> Result<(), SimError> {
    if condition {
        Ok(())
    } else {
        Err(SimError::check(msg()))
    }
}

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            config: SimConfig {
                seed,
                ..SimConfig::default()
            },
        }
    }

    /// Sets the virtual frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.config.fps = fps.max(1);
        self
    }

    /// Sets the frame budget per run.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.config.max_frames = max_frames;
        self
    }

    /// Sets the trial count of statistical scenarios.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.config.trials = trials.max(1);
        self
    }

    /// Sets the engine configuration.
    pub fn with_program_config(mut self, program: ProgramConfig) -> Self {
        self.config.program = program;
        self
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, &mut None)
    }

    /// Runs a scenario, sampling animated frames for export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut recording = Some(Vec::new());
        let result = self.execute(scenario, &mut recording);

        let mut export = SimExport::new(scenario.name(), self.config.seed);
        for frame in recording.unwrap_or_default() {
            export.add_frame(frame);
        }
        export.finalize(result.passed, result.sessions_completed);

        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, recording: &mut Option<Vec<SimFrame>>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        let outcome = match scenario {
            ScenarioId::FullProgram => self.run_full_program(recording),
            ScenarioId::PauseResume => self.run_pause_resume(recording),
            ScenarioId::ConditionBias => self.run_condition_bias(),
            ScenarioId::InstantProgram => self.run_instant_program(),
            ScenarioId::RepeatGeneration => self.run_repeat_generation(),
            ScenarioId::StopRearm => self.run_stop_rearm(recording),
        };

        outcome.unwrap_or_else(|err| {
            warn!("{} (seed={}) failed: {}", scenario.name(), self.config.seed, err);
            ScenarioResult::failed(scenario, self.config.seed, err.to_string())
        })
    }

    fn world(&self, recording: &Option<Vec<SimFrame>>) -> Result<SimWorld, SimError> {
        let mut world = SimWorld::new(self.config.clone())?;
        if recording.is_some() {
            world.enable_recording();
        }
        Ok(world)
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        world: &mut SimWorld,
        recording: &mut Option<Vec<SimFrame>>,
        mut metrics: ScenarioMetrics,
    ) -> ScenarioResult {
        if let Some(frames) = recording.as_mut() {
            frames.extend(world.take_frames());
        }

        metrics.paused_frames = world.paused_frames();
        metrics.invariant_checks = world.invariant_checks();
        metrics.events_received = world.events().len();

        ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: true,
            total_frames: world.frame_count(),
            final_time_secs: world.time(),
            sessions_completed: world
                .program()
                .sessions()
                .iter()
                .filter(|s| s.is_completed())
                .count(),
            failure_reason: None,
            metrics,
        }
    }

    /// SIM-001: FullProgram - generate, start all, play to the end.
    ///
    /// **Assertion**: every session completed with ranked results, one
    /// completion event each, active pointer cleared.
    fn run_full_program(&self, recording: &mut Option<Vec<SimFrame>>) -> Result<ScenarioResult, SimError> {
        info!("SIM-001: FullProgram - chained playback");

        let mut world = self.world(recording)?;
        let ids = world.generate_program()?;
        world.program_mut().start_all_races();
        world.check()?;

        let frames = world.run_until_idle()?;

        let program = world.program();
        ensure(program.active_race_session_id().is_none(), || {
            "active session still set after the last race".to_string()
        })?;
        ensure(!program.wants_frame(), || "frames still requested when idle".to_string())?;
        for session in program.sessions() {
            ensure(session.is_completed(), || format!("session {} not completed", session.id))?;
            ensure(session.results.len() == session.horses.len(), || {
                format!(
                    "session {} has {} results for {} horses",
                    session.id,
                    session.results.len(),
                    session.horses.len()
                )
            })?;
        }

        let completions = world
            .events()
            .iter()
            .filter(|e| matches!(e, RaceEvent::SessionCompleted { .. }))
            .count();
        ensure(completions == ids.len(), || {
            format!("{} completion events for {} sessions", completions, ids.len())
        })?;
        ensure(world.events().last() == Some(&RaceEvent::AnimationIdle), || {
            "playback did not end idle".to_string()
        })?;

        info!(
            "✓ FullProgram complete: {} sessions in {} frames ({:.1}s virtual)",
            ids.len(),
            frames,
            world.time()
        );

        Ok(self.finish(ScenarioId::FullProgram, &mut world, recording, ScenarioMetrics::default()))
    }

    /// SIM-002: PauseResume - hold a paused session for three seconds.
    ///
    /// **Assertion**: no position changes while paused, and exactly the
    /// paused span is excluded from race time.
    fn run_pause_resume(&self, recording: &mut Option<Vec<SimFrame>>) -> Result<ScenarioResult, SimError> {
        info!("SIM-002: PauseResume - suspension and pause accounting");

        let fps = u64::from(self.config.fps);
        let mut world = self.world(recording)?;
        world.generate_program()?;
        world.program_mut().start_all_races();
        world.run_frames(fps)?;

        world.program_mut().pause_session();
        world.check()?;
        let paused = world.program().active_race_session().map(|s| s.state());
        ensure(paused == Some(RaceState::Paused), || {
            format!("active session is {:?} after pause", paused)
        })?;

        let frozen = world.program().horse_positions().clone();
        let hold = fps * 3;
        for frame in 0..hold {
            world.tick()?;
            ensure(world.program().horse_positions() == &frozen, || {
                format!("horse moved on paused frame {}", frame)
            })?;
        }
        ensure(world.program().wants_frame(), || "paused session stopped the frame loop".to_string())?;

        // Resume through the toggle, the way the dashboard button does
        world.program_mut().toggle_session_race();
        world.check()?;
        world.tick()?;

        let expected_pause = world.context.frame_interval() * hold as u32;
        let accumulated = world.program().animator().accumulated_pause();
        ensure(accumulated == expected_pause, || {
            format!("accumulated pause {:?}, expected {:?}", accumulated, expected_pause)
        })?;
        debug!("  paused for {:?}", accumulated);

        world.run_until_idle()?;

        let program = world.program();
        ensure(program.sessions().iter().all(|s| s.is_completed()), || {
            "program did not finish after resume".to_string()
        })?;
        let saw_pause = world.events().iter().any(|e| matches!(e, RaceEvent::SessionPaused { .. }));
        let saw_resume = world.events().iter().any(|e| matches!(e, RaceEvent::SessionResumed { .. }));
        ensure(saw_pause && saw_resume, || "pause/resume events missing".to_string())?;

        info!(
            "✓ PauseResume complete: {} paused frames held, {:?} excluded",
            world.paused_frames(),
            accumulated
        );

        Ok(self.finish(ScenarioId::PauseResume, &mut world, recording, ScenarioMetrics::default()))
    }

    /// SIM-003: ConditionBias - finish times favour fit horses.
    ///
    /// **Assertion**: over N trials the score-100 horse has the lower mean
    /// finish time, both through `calculate_finish_time` and ranked races.
    fn run_condition_bias(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-003: ConditionBias - {} trials", self.config.trials);

        let distance = self.config.program.distances.first().copied().unwrap_or(1200);
        let strong = Horse::new(1, "Strong", "#000000", 100);
        let weak = Horse::new(2, "Weak", "#FFFFFF", 1);
        let pair = [weak.clone(), strong.clone()];
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let mut strong_total = 0.0;
        let mut weak_total = 0.0;
        let mut strong_wins = 0usize;

        for _ in 0..self.config.trials {
            strong_total += calculate_finish_time(&strong, distance, &mut rng);
            weak_total += calculate_finish_time(&weak, distance, &mut rng);

            let results = resolve_instant(&pair, distance, &mut rng);
            if results.first().map(|r| r.horse_id) == Some(strong.id) {
                strong_wins += 1;
            }
        }

        let trials = self.config.trials as f64;
        let metrics = ScenarioMetrics {
            strong_mean_time: strong_total / trials,
            weak_mean_time: weak_total / trials,
            ..ScenarioMetrics::default()
        };

        ensure(metrics.strong_mean_time < metrics.weak_mean_time, || {
            format!(
                "mean finish {:.2}s (score 100) not below {:.2}s (score 1)",
                metrics.strong_mean_time, metrics.weak_mean_time
            )
        })?;
        ensure(strong_wins * 2 > self.config.trials, || {
            format!("score-100 horse won only {}/{} races", strong_wins, self.config.trials)
        })?;

        info!(
            "✓ ConditionBias complete: {:.2}s vs {:.2}s, {} of {} wins",
            metrics.strong_mean_time, metrics.weak_mean_time, strong_wins, self.config.trials
        );

        Ok(ScenarioResult {
            scenario: ScenarioId::ConditionBias,
            seed: self.config.seed,
            passed: true,
            total_frames: 0,
            final_time_secs: 0.0,
            sessions_completed: 0,
            failure_reason: None,
            metrics,
        })
    }

    /// SIM-004: InstantProgram - round-indexed resolution and guards.
    fn run_instant_program(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-004: InstantProgram - run_all_races and lifecycle guards");

        let mut world = self.world(&None)?;
        world.program_mut().reset_races()?;
        world.check()?;

        let rounds = world.program().races().len() as u32;
        let missing = rounds + 1;

        let program = world.program_mut();
        let err = program.run_race(missing).err();
        ensure(err == Some(RaceError::NotFound(RaceRef::Round(missing))), || {
            format!("run_race({}) returned {:?}", missing, err)
        })?;

        let err = program.pause_race(1).err();
        ensure(
            err == Some(RaceError::transition(RaceRef::Round(1), TransitionError::NotRunning)),
            || format!("pause_race on a pending round returned {:?}", err),
        )?;

        program.start_race(1)?;
        program.pause_race(1)?;
        program.resume_race(1)?;
        program.run_all_races()?;
        world.check()?;

        let program = world.program();
        for race in program.races() {
            ensure(race.is_completed(), || format!("round {} not completed", race.round))?;
            ensure(race.results.len() == race.horses.len(), || {
                format!("round {} has {} results", race.round, race.results.len())
            })?;
        }
        let stored = program.get_race_results(1).to_vec();
        ensure(program.get_race_results(missing).is_empty(), || {
            "results returned for a missing round".to_string()
        })?;

        let program = world.program_mut();
        let again = program.run_race(1)?;
        ensure(again == stored, || "run_race is not idempotent".to_string())?;

        let err = program.start_race(1).err();
        ensure(
            err == Some(RaceError::transition(RaceRef::Round(1), TransitionError::AlreadyCompleted)),
            || format!("start_race on a completed round returned {:?}", err),
        )?;

        world.check()?;

        let round_events = world
            .events()
            .iter()
            .filter(|e| matches!(e, RaceEvent::RaceRoundCompleted { .. }))
            .count();
        ensure(round_events == rounds as usize, || {
            format!("{} round completion events for {} rounds", round_events, rounds)
        })?;

        info!("✓ InstantProgram complete: {} rounds resolved", rounds);

        let metrics = ScenarioMetrics {
            rounds_completed: round_events,
            ..ScenarioMetrics::default()
        };
        Ok(self.finish(ScenarioId::InstantProgram, &mut world, &mut None, metrics))
    }

    /// SIM-005: RepeatGeneration - ids across generations and registry growth.
    fn run_repeat_generation(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-005: RepeatGeneration - id monotonicity");

        let mut world = self.world(&None)?;
        let mut all_ids = Vec::new();

        for _ in 0..3 {
            let ids = world.generate_program()?;
            all_ids.extend(ids);
            world.check()?;
        }

        ensure(all_ids.windows(2).all(|w| w[0] < w[1]), || {
            format!("session ids not strictly increasing: {:?}", all_ids)
        })?;
        ensure(world.program().current_session_id() == all_ids.first().copied(), || {
            "selection moved on regeneration".to_string()
        })?;

        for i in 0..5 {
            world
                .program_mut()
                .add_horse(NewHorse::new(format!("Guest {}", i + 1), "#336699"));
        }
        world.check()?;

        let existing: HashSet<_> = world.program().registry().horses().iter().map(|h| h.id).collect();
        let mut reserved = HashSet::new();
        for _ in 0..50 {
            let id = world.program_mut().generate_unique_id();
            ensure(!existing.contains(&id) && reserved.insert(id), || {
                format!("generate_unique_id returned used id {}", id)
            })?;
        }

        let ids = world.generate_program()?;
        world.check()?;
        ensure(ids.first() > all_ids.last(), || "ids restarted after growth".to_string())?;

        info!(
            "✓ RepeatGeneration complete: {} sessions, {} horses",
            world.program().sessions().len(),
            world.program().registry().len()
        );

        Ok(self.finish(ScenarioId::RepeatGeneration, &mut world, &mut None, ScenarioMetrics::default()))
    }

    /// SIM-006: StopRearm - stop the frame loop, then pick it back up.
    fn run_stop_rearm(&self, recording: &mut Option<Vec<SimFrame>>) -> Result<ScenarioResult, SimError> {
        info!("SIM-006: StopRearm - cancellation");

        let fps = u64::from(self.config.fps);
        let mut world = self.world(recording)?;
        let ids = world.generate_program()?;
        world.program_mut().start_all_races();
        world.run_frames(fps / 2)?;

        let positions = world.program().horse_positions().clone();
        ensure(world.program_mut().stop_animation(), || "no frame to cancel".to_string())?;
        world.check()?;

        let delivered = world.run_frames(fps)?;
        ensure(delivered == 0, || format!("{} frames delivered after stop", delivered))?;
        ensure(world.program().horse_positions() == &positions, || {
            "positions changed after stop".to_string()
        })?;
        ensure(world.program().active_race_session_id() == ids.first().copied(), || {
            "stop cleared the active session".to_string()
        })?;

        world.program_mut().start_all_races();
        ensure(world.program().wants_frame(), || "start_all_races did not re-arm".to_string())?;

        // The stopped second is not race time
        world.tick()?;
        let jumped = world
            .program()
            .horse_positions()
            .iter()
            .find(|&(id, &p)| positions.get(id).map_or(true, |&before| (p - before).abs() > 1e-9));
        if let Some((id, p)) = jumped {
            return Err(SimError::check(format!(
                "horse {} jumped to {:.2} on the first frame after re-arm",
                id, p
            )));
        }

        world.run_until_idle()?;
        ensure(world.program().sessions().iter().all(|s| s.is_completed()), || {
            "program did not finish after re-arm".to_string()
        })?;

        info!("✓ StopRearm complete: {} frames", world.frame_count());

        Ok(self.finish(ScenarioId::StopRearm, &mut world, recording, ScenarioMetrics::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_program_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::FullProgram);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.sessions_completed, 6);
        assert!(result.total_frames > 0);
        assert_eq!(result.metrics.invariant_checks, result.total_frames + 1);
    }

    #[test]
    fn test_pause_resume_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::PauseResume);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.paused_frames, 180);
    }

    #[test]
    fn test_condition_bias_scenario() {
        let result = ScenarioRunner::new(42).with_trials(100).run(ScenarioId::ConditionBias);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.strong_mean_time < result.metrics.weak_mean_time);
    }

    #[test]
    fn test_instant_program_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::InstantProgram);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.rounds_completed, 6);
        assert_eq!(result.total_frames, 0);
    }

    #[test]
    fn test_repeat_generation_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::RepeatGeneration);

        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_stop_rearm_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::StopRearm);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.sessions_completed, 6);
    }

    #[test]
    fn test_small_pool_fails_as_data() {
        let config = ProgramConfig {
            initial_pool_size: 4,
            ..ProgramConfig::default()
        };
        let result = ScenarioRunner::new(1)
            .with_program_config(config)
            .run(ScenarioId::FullProgram);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("Horse pool"));
    }

    #[test]
    fn test_frame_budget_fails_as_data() {
        let result = ScenarioRunner::new(1).with_max_frames(50).run(ScenarioId::FullProgram);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("Frame budget"));
    }

    #[test]
    fn test_export_records_frames() {
        let (result, export) = ScenarioRunner::new(7).run_with_export(ScenarioId::FullProgram);

        assert!(result.passed);
        assert!(export.passed);
        assert_eq!(export.sessions_completed, 6);
        assert!(!export.frames.is_empty());
        assert!(export.duration_sec > 0.0);
    }

    #[test]
    fn test_full_program_deterministic() {
        let a = ScenarioRunner::new(9).run(ScenarioId::FullProgram);
        let b = ScenarioRunner::new(9).run(ScenarioId::FullProgram);

        assert_eq!(a.total_frames, b.total_frames);
        assert_eq!(a.metrics.events_received, b.metrics.events_received);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn test_instant_program_any_seed(seed in any::<u64>()) {
                let result = ScenarioRunner::new(seed).run(ScenarioId::InstantProgram);
                prop_assert!(result.passed, "{:?}", result.failure_reason);
            }

            #[test]
            fn test_repeat_generation_any_seed(seed in any::<u64>()) {
                let result = ScenarioRunner::new(seed).run(ScenarioId::RepeatGeneration);
                prop_assert!(result.passed, "{:?}", result.failure_reason);
            }
        }
    }
}
