//! The Program Orchestrator - public surface of the engine.
//!
//! Two running modes live side by side:
//! - **Animated**: `start_all_races` picks the first unfinished session and
//!   plays it frame by frame; on completion the next unfinished session is
//!   chained in until none are left. Session controls (`toggle_session_race`,
//!   `start_session`, ...) act on that animated session and quietly do
//!   nothing when there is none.
//! - **Instant**: round-indexed races resolved in one call (`run_race`,
//!   `run_all_races`). These operations return errors to the caller.
//!
//! The program never waits on anything. It asks for frames through its
//! `FrameQueue`; a host (`gallop_env::drive`, the simulator, a test loop)
//! delivers them through `FrameDriven::on_frame`.

use crate::animation::{FrameOutcome, RaceAnimator};
use crate::config::ProgramConfig;
use crate::error::{RaceError, RaceRef};
use crate::events::{EventHub, RaceEvent};
use crate::factory::{create_session, initialize_races, select_random_horses};
use crate::horse::{Horse, HorseId, HorseRegistry, NewHorse};
use crate::lifecycle::RaceState;
use crate::outcome::{resolve_instant, RaceResult};
use crate::session::{Race, Session, SessionId};
use crossbeam::channel::Receiver;
use gallop_env::{FrameDriven, FrameHandle, FrameQueue};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// A race program: horses, sessions, round-indexed races and the animation
/// that plays them.
pub struct RaceProgram {
    config: ProgramConfig,

    /// Horse pool rosters are drawn from
    registry: HorseRegistry,

    /// Every generated session, in creation order
    sessions: Vec<Session>,

    /// Id the next generated session gets
    next_session_id: u64,

    /// Session the user is browsing
    current_session_id: Option<SessionId>,

    /// Session being animated
    active_race_session_id: Option<SessionId>,

    animator: RaceAnimator,
    frames: FrameQueue,

    /// Round-indexed races (round = index + 1)
    races: Vec<Race>,
    current_round: u32,

    rng: ChaCha8Rng,
    events: EventHub,
}

impl RaceProgram {
    /// Creates a program with an entropy-seeded RNG.
    pub fn new(config: ProgramConfig) -> Result<Self, RaceError> {
        Self::from_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Creates a program whose every random draw follows from `seed`.
    pub fn with_seed(config: ProgramConfig, seed: u64) -> Result<Self, RaceError> {
        Self::from_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(config: ProgramConfig, mut rng: ChaCha8Rng) -> Result<Self, RaceError> {
        config.validate()?;

        let registry = HorseRegistry::generate(config.initial_pool_size, &mut rng);
        let animator = RaceAnimator::from_config(&config);

        Ok(Self {
            config,
            registry,
            sessions: Vec::new(),
            next_session_id: 1,
            current_session_id: None,
            active_race_session_id: None,
            animator,
            frames: FrameQueue::new(),
            races: Vec::new(),
            current_round: 1,
            rng,
            events: EventHub::new(),
        })
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    /// Registers a change-notification subscriber.
    pub fn subscribe(&mut self) -> Receiver<RaceEvent> {
        self.events.subscribe()
    }

    // ---- Registry ----

    pub fn registry(&self) -> &HorseRegistry {
        &self.registry
    }

    /// Adds a horse to the pool with a random condition score.
    pub fn add_horse(&mut self, new_horse: NewHorse) -> Horse {
        let horse = self.registry.add_horse(new_horse, &mut self.rng);
        debug!("Added horse {} ({})", horse.id, horse.name);
        horse
    }

    /// Reserves a horse id that has never been used.
    pub fn generate_unique_id(&mut self) -> HorseId {
        self.registry.generate_unique_id(&mut self.rng)
    }

    // ---- Program generation and browsing ----

    /// Appends one session per configured distance, each with a fresh roster.
    ///
    /// Nothing is appended if any roster can't be filled. The first new
    /// session becomes the current one if nothing is selected yet. Sessions
    /// are stamped with the wall clock; see `generate_program_at`.
    pub fn generate_program(&mut self) -> Result<Vec<SessionId>, RaceError> {
        self.generate_program_at(SystemTime::now())
    }

    /// `generate_program` with `created_at` taken from the host clock.
    pub fn generate_program_at(&mut self, created_at: SystemTime) -> Result<Vec<SessionId>, RaceError> {
        let pool = self.registry.horses();
        let mut generated = Vec::with_capacity(self.config.distances.len());

        for (offset, &distance) in self.config.distances.iter().enumerate() {
            let horses = select_random_horses(pool, self.config.horses_per_session, &mut self.rng)?;
            let id = SessionId(self.next_session_id + offset as u64);
            generated.push(create_session(id, distance, horses, created_at));
        }

        let ids: Vec<SessionId> = generated.iter().map(|s| s.id).collect();
        self.next_session_id += generated.len() as u64;
        self.sessions.extend(generated);

        info!(
            "Generated program: {} sessions ({} total)",
            ids.len(),
            self.sessions.len()
        );

        if self.current_session_id.is_none() {
            if let Some(&first) = ids.first() {
                self.current_session_id = Some(first);
                self.events.publish(RaceEvent::CurrentSessionChanged { id: Some(first) });
            }
        }

        self.events.publish(RaceEvent::ProgramGenerated {
            session_ids: ids.clone(),
        });

        Ok(ids)
    }

    /// Selects the session to browse. The id is not checked.
    pub fn set_current_session(&mut self, id: SessionId) {
        self.current_session_id = Some(id);
        self.events.publish(RaceEvent::CurrentSessionChanged { id: Some(id) });
    }

    pub fn current_session_id(&self) -> Option<SessionId> {
        self.current_session_id
    }

    /// The browsed session, if the selection points at one.
    pub fn current_session(&self) -> Option<&Session> {
        self.current_session_id.and_then(|id| self.session(id))
    }

    pub fn active_race_session_id(&self) -> Option<SessionId> {
        self.active_race_session_id
    }

    /// The session being animated, if any.
    pub fn active_race_session(&self) -> Option<&Session> {
        self.active_race_session_id.and_then(|id| self.session(id))
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn session_index(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    fn active_index(&self) -> Option<usize> {
        self.active_race_session_id
            .and_then(|id| self.session_index(id))
    }

    // ---- Animated playback ----

    /// Starts chained playback from the first unfinished session.
    ///
    /// With a session already animating this only re-arms the frame request
    /// if `stop_animation` dropped it.
    pub fn start_all_races(&mut self) {
        if let Some(active) = self.active_race_session_id {
            if self.frames.is_pending() {
                debug!("start_all_races: session {} already animating", active);
            } else {
                debug!("start_all_races: re-arming frames for session {}", active);
                self.frames.request();
            }
            return;
        }

        let next = self
            .sessions
            .iter()
            .find(|s| !s.is_completed())
            .map(|s| s.id);

        match next {
            Some(id) => {
                info!("Starting playback at session {}", id);
                self.begin_animation(id);
            }
            None => debug!("start_all_races: no unfinished session"),
        }
    }

    /// Starts, pauses or resumes the animated session.
    pub fn toggle_session_race(&mut self) {
        let Some(index) = self.active_index() else {
            debug!("toggle_session_race: no active session");
            return;
        };

        let id = self.sessions[index].id;
        let before = self.sessions[index].state();
        let after = self.sessions[index].lifecycle.toggle();
        debug!("Session {} toggled: {} -> {}", id, before, after);

        let event = match (before, after) {
            (RaceState::Pending, RaceState::Running) => RaceEvent::SessionStarted { id },
            (RaceState::Paused, RaceState::Running) => RaceEvent::SessionResumed { id },
            (RaceState::Running, RaceState::Paused) => RaceEvent::SessionPaused { id },
            _ => return,
        };
        self.events.publish(event);
    }

    /// Marks the animated session running. No-op once it completed.
    pub fn start_session(&mut self) {
        let Some(index) = self.active_index() else {
            debug!("start_session: no active session");
            return;
        };

        let id = self.sessions[index].id;
        match self.sessions[index].lifecycle.start() {
            Ok(()) => self.events.publish(RaceEvent::SessionStarted { id }),
            Err(reason) => debug!("start_session: session {} {}", id, reason),
        }
    }

    /// Pauses the animated session. No-op unless it is running.
    pub fn pause_session(&mut self) {
        let Some(index) = self.active_index() else {
            debug!("pause_session: no active session");
            return;
        };

        let id = self.sessions[index].id;
        match self.sessions[index].lifecycle.pause() {
            Ok(()) => self.events.publish(RaceEvent::SessionPaused { id }),
            Err(reason) => debug!("pause_session: session {} {}", id, reason),
        }
    }

    /// Resumes the animated session. No-op unless it is running.
    pub fn resume_session(&mut self) {
        let Some(index) = self.active_index() else {
            debug!("resume_session: no active session");
            return;
        };

        let id = self.sessions[index].id;
        match self.sessions[index].lifecycle.resume() {
            Ok(()) => self.events.publish(RaceEvent::SessionResumed { id }),
            Err(reason) => debug!("resume_session: session {} {}", id, reason),
        }
    }

    /// Stores `results` on the browsed session and completes it.
    ///
    /// The instant path: no animation. If the browsed session is the one
    /// animating, playback moves on to the next unfinished session.
    pub fn complete_session(&mut self, results: Vec<RaceResult>) {
        let Some(index) = self
            .current_session_id
            .and_then(|id| self.session_index(id))
        else {
            debug!("complete_session: no current session");
            return;
        };

        let session = &mut self.sessions[index];
        session.complete(results);
        let id = session.id;
        let winner = session.winner().cloned();

        info!("Session {} completed", id);
        self.events.publish(RaceEvent::SessionCompleted { id, winner });

        if self.active_race_session_id == Some(id) {
            self.chain_after(id);
        }
    }

    /// Completes the animated session with `results` and chains to the next
    /// unfinished one.
    pub fn complete_active_race_session(&mut self, results: Vec<RaceResult>) {
        let Some(id) = self.active_race_session_id else {
            debug!("complete_active_race_session: no active session");
            return;
        };

        let mut winner = None;
        if let Some(index) = self.session_index(id) {
            let session = &mut self.sessions[index];
            session.complete(results);
            winner = session.winner().cloned();
        }

        match &winner {
            Some(w) => info!("Session {} completed, winner {} in {:.2}s", id, w.horse_name, w.finish_time),
            None => info!("Session {} completed", id),
        }
        self.events.publish(RaceEvent::SessionCompleted { id, winner });

        self.chain_after(id);
    }

    /// Cancels the pending frame. Positions stay as last computed and the
    /// stopped period is not counted as race time.
    ///
    /// Returns true if a frame was cancelled.
    pub fn stop_animation(&mut self) -> bool {
        match self.frames.cancel_pending() {
            Some(handle) => {
                debug!("Animation stopped ({} cancelled)", handle);
                self.animator.hold();
                true
            }
            None => false,
        }
    }

    fn begin_animation(&mut self, id: SessionId) {
        self.active_race_session_id = Some(id);

        let Some(index) = self.session_index(id) else {
            warn!("Session {} vanished before it could start", id);
            self.active_race_session_id = None;
            return;
        };

        let session = &mut self.sessions[index];
        let started = session.lifecycle.start();
        self.animator.initialize(&session.horses, &mut self.rng);
        self.frames.request();

        match started {
            Ok(()) => self.events.publish(RaceEvent::SessionStarted { id }),
            Err(reason) => debug!("Session {} not started: {}", id, reason),
        }
    }

    fn chain_after(&mut self, finished: SessionId) {
        let next = self
            .sessions
            .iter()
            .find(|s| !s.is_completed() && s.id != finished)
            .map(|s| s.id);

        match next {
            Some(id) => {
                info!("Chaining to session {}", id);
                self.begin_animation(id);
            }
            None => {
                info!("All sessions completed");
                self.active_race_session_id = None;
                self.frames.cancel_pending();
                self.events.publish(RaceEvent::AnimationIdle);
            }
        }
    }

    /// Live positions of the animated horses.
    pub fn horse_positions(&self) -> &HashMap<HorseId, f64> {
        self.animator.horse_positions()
    }

    /// Animated horses that crossed the finish line.
    pub fn finished_horses(&self) -> &HashSet<HorseId> {
        self.animator.finished_horses()
    }

    pub fn animator(&self) -> &RaceAnimator {
        &self.animator
    }

    /// Outstanding frame request, if any.
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frames.pending()
    }

    pub fn frames(&self) -> &FrameQueue {
        &self.frames
    }

    // ---- Round-indexed races ----

    /// Rebuilds rounds `1..=N` from the pool and rewinds to round 1.
    pub fn reset_races(&mut self) -> Result<(), RaceError> {
        self.races = initialize_races(
            self.registry.horses(),
            &self.config.distances,
            self.config.horses_per_session,
            &mut self.rng,
        )?;
        self.current_round = 1;

        info!("Reset {} races", self.races.len());
        self.events.publish(RaceEvent::RacesReset);
        Ok(())
    }

    pub fn races(&self) -> &[Race] {
        &self.races
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    fn race_index(&self, round: u32) -> Result<usize, RaceError> {
        round
            .checked_sub(1)
            .map(|i| i as usize)
            .filter(|&i| i < self.races.len())
            .ok_or(RaceError::NotFound(RaceRef::Round(round)))
    }

    pub fn get_race(&self, round: u32) -> Option<&Race> {
        self.race_index(round).ok().map(|i| &self.races[i])
    }

    /// Results of a round; empty if the round doesn't exist or hasn't run.
    pub fn get_race_results(&self, round: u32) -> &[RaceResult] {
        self.get_race(round).map_or(&[], |race| race.results.as_slice())
    }

    /// Resolves a round instantly. A completed round returns its stored results.
    pub fn run_race(&mut self, round: u32) -> Result<Vec<RaceResult>, RaceError> {
        let index = self.race_index(round)?;
        let race = &mut self.races[index];

        if race.is_completed() {
            debug!("Race round {} already completed", round);
            return Ok(race.results.clone());
        }

        let results = resolve_instant(&race.horses, race.distance, &mut self.rng);
        race.complete(results.clone());

        debug!("Race round {} resolved ({} results)", round, results.len());
        self.events.publish(RaceEvent::RaceRoundCompleted { round });
        Ok(results)
    }

    /// Resolves every round that hasn't completed.
    pub fn run_all_races(&mut self) -> Result<(), RaceError> {
        let pending: Vec<u32> = self
            .races
            .iter()
            .filter(|race| !race.is_completed())
            .map(|race| race.round)
            .collect();

        for round in pending {
            self.run_race(round)?;
        }
        Ok(())
    }

    pub fn start_race(&mut self, round: u32) -> Result<(), RaceError> {
        let index = self.race_index(round)?;
        self.races[index]
            .lifecycle
            .start()
            .map_err(|reason| RaceError::transition(RaceRef::Round(round), reason))
    }

    pub fn pause_race(&mut self, round: u32) -> Result<(), RaceError> {
        let index = self.race_index(round)?;
        self.races[index]
            .lifecycle
            .pause()
            .map_err(|reason| RaceError::transition(RaceRef::Round(round), reason))
    }

    pub fn resume_race(&mut self, round: u32) -> Result<(), RaceError> {
        let index = self.race_index(round)?;
        self.races[index]
            .lifecycle
            .resume()
            .map_err(|reason| RaceError::transition(RaceRef::Round(round), reason))
    }
}

impl FrameDriven for RaceProgram {
    fn wants_frame(&self) -> bool {
        self.frames.is_pending()
    }

    /// One animation frame for the active session.
    ///
    /// Frames arriving without an outstanding request (cancelled by
    /// `stop_animation`) are dropped.
    fn on_frame(&mut self, timestamp: Duration) {
        if self.frames.take().is_none() {
            return;
        }

        let Some(id) = self.active_race_session_id else {
            return;
        };
        let Some(index) = self.session_index(id) else {
            warn!("Active session {} not found, stopping", id);
            self.active_race_session_id = None;
            return;
        };

        let session = &self.sessions[index];
        let suspended = !session.is_running() || session.is_paused();
        match self.animator.advance(&session.horses, suspended, timestamp) {
            FrameOutcome::Suspended | FrameOutcome::Advanced => {
                self.frames.request();
            }
            FrameOutcome::Finished(results) => {
                self.complete_active_race_session(results);
            }
            FrameOutcome::Idle => {
                // Results already handed out
                warn!("Session {} has nothing left to animate", id);
                self.chain_after(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransitionError;
    use crate::lifecycle::Lifecycle;
    use approx::assert_relative_eq;

    fn program(seed: u64) -> RaceProgram {
        RaceProgram::with_seed(ProgramConfig::default(), seed).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Delivers frames every `step` ms until the program stops asking.
    fn run_frames(program: &mut RaceProgram, start: u64, step: u64, max_frames: u64) -> u64 {
        let mut t = start;
        let mut frames = 0;
        while program.wants_frame() {
            assert!(frames < max_frames, "frame budget exhausted");
            t += step;
            program.on_frame(ms(t));
            frames += 1;
        }
        frames
    }

    fn result(horse_id: HorseId, position: u32, finish_time: f64) -> RaceResult {
        RaceResult {
            horse_id,
            horse_name: format!("Horse {}", horse_id),
            finish_time,
            position,
        }
    }

    #[test]
    fn test_new_program_is_empty() {
        let program = program(1);

        assert_eq!(program.registry().len(), 20);
        assert!(program.sessions().is_empty());
        assert!(program.races().is_empty());
        assert_eq!(program.current_round(), 1);
        assert!(program.current_session().is_none());
        assert!(program.active_race_session().is_none());
        assert!(program.horse_positions().is_empty());
        assert!(program.finished_horses().is_empty());
        assert!(!program.wants_frame());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ProgramConfig {
            distances: Vec::new(),
            ..ProgramConfig::default()
        };
        assert!(matches!(
            RaceProgram::with_seed(config, 1),
            Err(RaceError::Config(_))
        ));
    }

    #[test]
    fn test_generate_program() {
        let mut program = program(2);

        let ids = program.generate_program().unwrap();

        assert_eq!(ids.len(), 6);
        assert_eq!(program.current_session_id(), Some(ids[0]));
        for (session, &distance) in program.sessions().iter().zip(crate::factory::RACE_DISTANCES.iter()) {
            assert_eq!(session.distance, distance);
            assert_eq!(session.horses.len(), 10);
            assert_eq!(session.name, format!("Race {} - {}m", session.id, distance));
            assert!(session.results.is_empty());
            assert_eq!(session.state(), RaceState::Pending);

            let unique: HashSet<_> = session.horses.iter().map(|h| h.id).collect();
            assert_eq!(unique.len(), 10);
        }
    }

    #[test]
    fn test_generate_twice_appends_with_increasing_ids() {
        let mut program = program(3);

        let first = program.generate_program().unwrap();
        program.set_current_session(first[2]);
        let second = program.generate_program().unwrap();

        assert_eq!(program.sessions().len(), 12);
        let ids: Vec<u64> = program.sessions().iter().map(|s| s.id.as_u64()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(second[0] > first[5]);
        // Existing selection is kept
        assert_eq!(program.current_session_id(), Some(first[2]));
    }

    #[test]
    fn test_generate_with_small_pool_appends_nothing() {
        let config = ProgramConfig {
            initial_pool_size: 5,
            ..ProgramConfig::default()
        };
        let mut program = RaceProgram::with_seed(config, 4).unwrap();

        let err = program.generate_program().unwrap_err();

        assert_eq!(
            err,
            RaceError::InsufficientHorses {
                requested: 10,
                available: 5
            }
        );
        assert!(program.sessions().is_empty());
        assert!(program.current_session_id().is_none());
    }

    #[test]
    fn test_set_current_session_is_unchecked() {
        let mut program = program(5);

        program.set_current_session(SessionId(9999));

        assert_eq!(program.current_session_id(), Some(SessionId(9999)));
        assert!(program.current_session().is_none());
    }

    #[test]
    fn test_add_horse_grows_pool() {
        let mut program = program(6);

        let horse = program.add_horse(NewHorse::new("Comet", "#123456"));

        assert_eq!(program.registry().len(), 21);
        assert_eq!(program.registry().get(horse.id), Some(&horse));
        assert!((1..=100).contains(&horse.condition_score));
        let reserved = program.generate_unique_id();
        assert_ne!(reserved, horse.id);
    }

    #[test]
    fn test_start_all_races_without_sessions() {
        let mut program = program(7);

        program.start_all_races();

        assert!(program.active_race_session_id().is_none());
        assert!(!program.wants_frame());
    }

    #[test]
    fn test_start_all_races_activates_first_session() {
        let mut program = program(8);
        let ids = program.generate_program().unwrap();

        program.start_all_races();

        assert_eq!(program.active_race_session_id(), Some(ids[0]));
        assert_eq!(program.horse_positions().len(), 10);
        assert!(program.active_race_session().unwrap().is_running());
        assert!(program.pending_frame().is_some());
    }

    #[test]
    fn test_start_all_races_skips_completed_sessions() {
        let mut program = program(9);
        let ids = program.generate_program().unwrap();
        program.complete_session(vec![result(1, 1, 10.0)]);

        program.start_all_races();

        assert_eq!(program.active_race_session_id(), Some(ids[1]));
    }

    #[test]
    fn test_full_program_plays_to_completion() {
        let mut program = program(10);
        let events = program.subscribe();
        program.generate_program().unwrap();

        program.start_all_races();
        run_frames(&mut program, 0, 16, 20_000);

        assert!(program.active_race_session_id().is_none());
        assert!(!program.wants_frame());
        for session in program.sessions() {
            assert!(session.is_completed());
            assert!(!session.is_running());
            assert_eq!(session.results.len(), session.horses.len());

            let positions: Vec<u32> = session.results.iter().map(|r| r.position).collect();
            assert_eq!(positions, (1..=10).collect::<Vec<u32>>());
            assert!(session
                .results
                .windows(2)
                .all(|w| w[0].finish_time <= w[1].finish_time));
        }

        let received: Vec<RaceEvent> = events.try_iter().collect();
        let completed = received
            .iter()
            .filter(|e| matches!(e, RaceEvent::SessionCompleted { .. }))
            .count();
        assert_eq!(completed, 6);
        assert_eq!(received.last(), Some(&RaceEvent::AnimationIdle));
    }

    #[test]
    fn test_chaining_resets_animation() {
        let mut program = program(11);
        let ids = program.generate_program().unwrap();
        program.start_all_races();

        let mut t = 0;
        while program.active_race_session_id() == Some(ids[0]) {
            t += 16;
            program.on_frame(ms(t));
        }

        assert_eq!(program.active_race_session_id(), Some(ids[1]));
        assert!(program.session(ids[0]).unwrap().is_completed());
        assert!(program.finished_horses().is_empty());
        assert!(program.horse_positions().values().all(|&p| p == 0.0));
        assert!(program.wants_frame());
    }

    #[test]
    fn test_paused_session_holds_positions() {
        let mut program = program(12);
        program.generate_program().unwrap();
        program.start_all_races();

        for t in (16..=2_000).step_by(16) {
            program.on_frame(ms(t));
        }
        program.pause_session();
        assert!(program.active_race_session().unwrap().is_paused());

        let frozen = program.horse_positions().clone();
        for t in (2_016..=10_000).step_by(16) {
            program.on_frame(ms(t));
            assert_eq!(program.horse_positions(), &frozen);
        }
        // Paused sessions keep the frame loop alive
        assert!(program.wants_frame());

        program.resume_session();
        program.on_frame(ms(10_016));
        program.on_frame(ms(10_032));
        assert!(program
            .horse_positions()
            .iter()
            .any(|(id, &p)| p > frozen[id]));
    }

    #[test]
    fn test_toggle_cycles_active_session() {
        let mut program = program(13);
        program.generate_program().unwrap();
        program.start_all_races();

        program.toggle_session_race();
        assert_eq!(program.active_race_session().unwrap().state(), RaceState::Paused);

        program.toggle_session_race();
        assert_eq!(program.active_race_session().unwrap().state(), RaceState::Running);
    }

    #[test]
    fn test_session_controls_without_active_session_are_noops() {
        let mut program = program(14);
        program.generate_program().unwrap();
        let before: Vec<RaceState> = program.sessions().iter().map(|s| s.state()).collect();

        program.toggle_session_race();
        program.start_session();
        program.pause_session();
        program.resume_session();
        program.complete_active_race_session(Vec::new());

        let after: Vec<RaceState> = program.sessions().iter().map(|s| s.state()).collect();
        assert_eq!(before, after);
        assert!(!program.wants_frame());
    }

    #[test]
    fn test_complete_session_uses_browsed_session() {
        let mut program = program(15);
        let ids = program.generate_program().unwrap();
        program.set_current_session(ids[3]);

        program.complete_session(vec![result(7, 1, 10.5)]);

        let session = program.session(ids[3]).unwrap();
        assert!(session.is_completed());
        assert_eq!(session.winner().map(|w| w.horse_id), Some(7));
        assert!(!program.session(ids[0]).unwrap().is_completed());
    }

    #[test]
    fn test_complete_active_race_session_chains() {
        let mut program = program(16);
        let ids = program.generate_program().unwrap();
        program.start_all_races();

        program.complete_active_race_session(vec![result(1, 1, 12.0)]);

        assert!(program.session(ids[0]).unwrap().is_completed());
        assert_eq!(program.active_race_session_id(), Some(ids[1]));
        assert!(program.session(ids[1]).unwrap().is_running());
    }

    #[test]
    fn test_stop_animation_and_rearm() {
        let mut program = program(17);
        let ids = program.generate_program().unwrap();
        program.start_all_races();
        for t in (16..=1_000).step_by(16) {
            program.on_frame(ms(t));
        }
        let positions = program.horse_positions().clone();

        assert!(program.stop_animation());
        assert!(!program.wants_frame());
        assert!(!program.stop_animation());

        // A late callback for the cancelled frame does nothing
        program.on_frame(ms(1_500));
        assert_eq!(program.horse_positions(), &positions);
        assert_eq!(program.active_race_session_id(), Some(ids[0]));

        program.start_all_races();
        assert!(program.wants_frame());
        assert_eq!(program.active_race_session_id(), Some(ids[0]));

        // The stopped period is not race time: frames resume where they left off
        program.on_frame(ms(6_000));
        for (id, &p) in program.horse_positions() {
            assert_relative_eq!(p, positions[id], epsilon = 1e-9);
        }

        program.on_frame(ms(6_016));
        let base_speed = program.config().base_speed;
        for (id, &p) in program.horse_positions() {
            let step = base_speed * program.animator().speed_factors()[id] * 0.016;
            assert_relative_eq!(p - positions[id], step, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_complete_session_on_active_session_chains() {
        let mut program = program(24);
        let ids = program.generate_program().unwrap();
        program.start_all_races();
        for t in (16..=480).step_by(16) {
            program.on_frame(ms(t));
        }
        assert!(program.horse_positions().values().any(|&p| p > 0.0));

        // Browsed and animated session are the same
        program.complete_session(Vec::new());

        assert!(program.session(ids[0]).unwrap().is_completed());
        assert_eq!(program.active_race_session_id(), Some(ids[1]));
        assert!(!program.active_race_session().unwrap().is_completed());
        assert!(program.horse_positions().values().all(|&p| p == 0.0));
        assert!(program.finished_horses().is_empty());
        assert!(program.wants_frame());

        program.on_frame(ms(496));
        program.on_frame(ms(1_496));
        assert_eq!(program.active_race_session_id(), Some(ids[1]));
        let roster: HashSet<HorseId> = program
            .active_race_session()
            .unwrap()
            .horses
            .iter()
            .map(|h| h.id)
            .collect();
        let animated: HashSet<HorseId> = program.horse_positions().keys().copied().collect();
        assert_eq!(animated, roster);
        assert!(program.horse_positions().values().all(|&p| p > 0.0));
    }

    #[test]
    fn test_complete_last_active_session_goes_idle() {
        let config = ProgramConfig {
            distances: vec![1200],
            ..ProgramConfig::default()
        };
        let mut program = RaceProgram::with_seed(config, 25).unwrap();
        let events = program.subscribe();
        program.generate_program().unwrap();
        program.start_all_races();

        program.complete_session(Vec::new());

        assert!(program.active_race_session_id().is_none());
        assert!(!program.wants_frame());
        let received: Vec<RaceEvent> = events.try_iter().collect();
        assert_eq!(received.last(), Some(&RaceEvent::AnimationIdle));
    }

    #[test]
    fn test_session_started_published_once() {
        let mut program = program(26);
        let events = program.subscribe();
        let ids = program.generate_program().unwrap();

        program.start_all_races();
        program.start_all_races();

        let started: Vec<RaceEvent> = events
            .try_iter()
            .filter(|e| matches!(e, RaceEvent::SessionStarted { .. }))
            .collect();
        assert_eq!(started, vec![RaceEvent::SessionStarted { id: ids[0] }]);
    }

    #[test]
    fn test_generate_program_at_uses_host_clock() {
        let mut program = program(27);
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200);

        program.generate_program_at(stamp).unwrap();

        assert!(program.sessions().iter().all(|s| s.created_at == stamp));
    }

    #[test]
    fn test_reset_races() {
        let mut program = program(18);

        program.reset_races().unwrap();

        assert_eq!(program.races().len(), 6);
        assert_eq!(program.current_round(), 1);
        for (index, race) in program.races().iter().enumerate() {
            assert_eq!(race.round as usize, index + 1);
            assert_eq!(race.horses.len(), 10);
            assert_eq!(race.state(), RaceState::Pending);
        }
    }

    #[test]
    fn test_round_queries_for_unknown_round() {
        let program = program(19);

        assert!(program.get_race(1).is_none());
        assert!(program.get_race(0).is_none());
        assert!(program.get_race_results(1).is_empty());
    }

    #[test]
    fn test_run_race_unknown_round() {
        let mut program = program(20);

        let err = program.run_race(1).unwrap_err();

        assert_eq!(err, RaceError::NotFound(RaceRef::Round(1)));
        assert_eq!(err.to_string(), "Race round 1 not found");
    }

    #[test]
    fn test_run_race_is_ranked_and_idempotent() {
        let mut program = program(21);
        program.reset_races().unwrap();

        let results = program.run_race(1).unwrap();

        assert_eq!(results.len(), 10);
        let positions: Vec<u32> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, (1..=10).collect::<Vec<u32>>());
        assert!(results.windows(2).all(|w| w[0].finish_time <= w[1].finish_time));

        let race = program.get_race(1).unwrap();
        assert!(race.is_completed());
        assert!(!race.lifecycle.is_running());
        assert_eq!(program.get_race_results(1), results.as_slice());

        assert_eq!(program.run_race(1).unwrap(), results);
    }

    #[test]
    fn test_run_all_races_keeps_existing_results() {
        let mut program = program(22);
        program.reset_races().unwrap();
        let first = program.run_race(1).unwrap();

        program.run_all_races().unwrap();

        assert!(program.races().iter().all(|r| r.is_completed()));
        assert_eq!(program.get_race_results(1), first.as_slice());
    }

    #[test]
    fn test_round_lifecycle_guards() {
        let mut program = program(23);
        program.reset_races().unwrap();

        assert_eq!(
            program.pause_race(1).unwrap_err().to_string(),
            "Race round 1 is not running"
        );
        assert_eq!(
            program.resume_race(1).unwrap_err(),
            RaceError::transition(RaceRef::Round(1), TransitionError::NotRunning)
        );

        program.start_race(1).unwrap();
        program.pause_race(1).unwrap();
        assert_eq!(program.get_race(1).unwrap().state(), RaceState::Paused);
        program.resume_race(1).unwrap();
        assert_eq!(program.get_race(1).unwrap().state(), RaceState::Running);

        program.run_race(1).unwrap();
        assert_eq!(
            program.start_race(1).unwrap_err().to_string(),
            "Race round 1 has already been completed"
        );

        assert_eq!(
            program.start_race(7).unwrap_err(),
            RaceError::NotFound(RaceRef::Round(7))
        );
    }

    #[test]
    fn test_pause_completed_running_round() {
        let mut program = program(24);
        program.reset_races().unwrap();
        program.races[0].lifecycle = Lifecycle::from_flags(true, true, false);

        assert_eq!(
            program.pause_race(1).unwrap_err().to_string(),
            "Race round 1 has already been completed"
        );
    }

    #[test]
    fn test_same_seed_same_program() {
        let mut a = program(99);
        let mut b = program(99);
        a.generate_program().unwrap();
        b.generate_program().unwrap();

        let rosters = |p: &RaceProgram| -> Vec<Vec<HorseId>> {
            p.sessions()
                .iter()
                .map(|s| s.horses.iter().map(|h| h.id).collect())
                .collect()
        };
        assert_eq!(rosters(&a), rosters(&b));
    }
}
