//! Race Animation Scheduler state.
//!
//! Advances one session's horses from 0 to the finish line over host time.
//! The host calls `advance` once per frame with a monotonic timestamp; the
//! animator never schedules anything itself (the program owns the frame
//! queue and decides whether to request another frame).
//!
//! Pause accounting keeps paused wall time out of race time:
//! ```text
//! elapsed = (timestamp − start_time − accumulated_pause) in seconds
//! ```
//!
//! A stopped animation (`hold`) is accounted as a pause starting at the last
//! delivered frame.

use crate::config::ProgramConfig;
use crate::horse::{Horse, HorseId};
use crate::outcome::{rank_results, round_hundredths, RaceResult};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// What a single frame did.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Session paused; nothing moved
    Suspended,

    /// Horses moved; some are still running
    Advanced,

    /// The last horse crossed the line on this frame
    Finished(Vec<RaceResult>),

    /// Results were already produced; nothing left to animate
    Idle,
}

/// Per-session animation state.
#[derive(Debug, Clone)]
pub struct RaceAnimator {
    /// Finish line position
    track_length: f64,

    /// Track units per second at speed factor 1.0
    base_speed: f64,

    /// Live position of every horse, 0..=track_length
    horse_positions: HashMap<HorseId, f64>,

    /// Per-horse speed multiplier, fixed for the session
    speed_factors: HashMap<HorseId, f64>,

    /// Horses that reached the finish line
    finished_horses: HashSet<HorseId>,

    /// Race time (seconds) at which each horse finished
    finish_times: HashMap<HorseId, f64>,

    /// Timestamp of the first frame
    start_time: Option<Duration>,

    /// Total time spent paused
    accumulated_pause: Duration,

    /// Timestamp of the first frame of the current pause
    last_pause_start: Option<Duration>,

    /// Timestamp of the most recent frame
    last_frame: Option<Duration>,

    /// Set once results were handed out
    results_emitted: bool,
}

impl RaceAnimator {
    /// Creates an empty animator.
    pub fn new(track_length: f64, base_speed: f64) -> Self {
        Self {
            track_length,
            base_speed,
            horse_positions: HashMap::new(),
            speed_factors: HashMap::new(),
            finished_horses: HashSet::new(),
            finish_times: HashMap::new(),
            start_time: None,
            accumulated_pause: Duration::ZERO,
            last_pause_start: None,
            last_frame: None,
            results_emitted: false,
        }
    }

    /// Creates an animator with the track settings of `config`.
    pub fn from_config(config: &ProgramConfig) -> Self {
        Self::new(config.track_length, config.base_speed)
    }

    /// Stylized speed multiplier, roughly [0.68, 1.38], biased up by condition.
    pub fn speed_factor<R: Rng + ?Sized>(horse: &Horse, rng: &mut R) -> f64 {
        let random = 0.85 + rng.gen::<f64>() * 0.3;
        let condition = 0.8 + horse.condition_ratio() * 0.4;
        random * condition
    }

    /// Clears all state and lines `horses` up at position 0.
    pub fn initialize<R: Rng + ?Sized>(&mut self, horses: &[Horse], rng: &mut R) {
        self.reset();
        for horse in horses {
            self.horse_positions.insert(horse.id, 0.0);
            self.speed_factors.insert(horse.id, Self::speed_factor(horse, rng));
        }
    }

    /// Drops every horse and timing mark.
    pub fn reset(&mut self) {
        self.horse_positions.clear();
        self.speed_factors.clear();
        self.finished_horses.clear();
        self.finish_times.clear();
        self.start_time = None;
        self.accumulated_pause = Duration::ZERO;
        self.last_pause_start = None;
        self.last_frame = None;
        self.results_emitted = false;
    }

    /// Freezes race time at the last frame until the next `advance`.
    ///
    /// Used when the host stops delivering frames; the gap until frames
    /// resume is folded into the pause total.
    pub fn hold(&mut self) {
        if self.last_pause_start.is_none() {
            self.last_pause_start = self.last_frame;
        }
    }

    /// Runs one frame.
    pub fn advance(&mut self, horses: &[Horse], paused: bool, timestamp: Duration) -> FrameOutcome {
        if self.results_emitted {
            return FrameOutcome::Idle;
        }

        let start = *self.start_time.get_or_insert(timestamp);
        self.last_frame = Some(timestamp);

        if paused {
            if self.last_pause_start.is_none() {
                self.last_pause_start = Some(timestamp);
            }
            return FrameOutcome::Suspended;
        }

        if let Some(pause_start) = self.last_pause_start.take() {
            self.accumulated_pause += timestamp.saturating_sub(pause_start);
        }

        let elapsed = timestamp
            .saturating_sub(start)
            .saturating_sub(self.accumulated_pause)
            .as_secs_f64();

        for horse in horses {
            if self.finished_horses.contains(&horse.id) {
                continue;
            }

            let speed = self.speed_factors.get(&horse.id).copied().unwrap_or(1.0);
            let position = (self.base_speed * speed * elapsed).min(self.track_length);
            self.horse_positions.insert(horse.id, position);

            if position >= self.track_length {
                self.finished_horses.insert(horse.id);
                self.finish_times.insert(horse.id, round_hundredths(elapsed));
            }
        }

        let all_finished = horses.iter().all(|h| self.finished_horses.contains(&h.id));
        if all_finished {
            self.results_emitted = true;
            FrameOutcome::Finished(rank_results(horses, &self.finish_times))
        } else {
            FrameOutcome::Advanced
        }
    }

    /// Live positions, keyed by horse id.
    pub fn horse_positions(&self) -> &HashMap<HorseId, f64> {
        &self.horse_positions
    }

    /// Position of one horse, if it is on the track.
    pub fn position(&self, horse_id: HorseId) -> Option<f64> {
        self.horse_positions.get(&horse_id).copied()
    }

    pub fn finished_horses(&self) -> &HashSet<HorseId> {
        &self.finished_horses
    }

    /// Race time (seconds) at which each finished horse crossed the line.
    pub fn finish_times(&self) -> &HashMap<HorseId, f64> {
        &self.finish_times
    }

    pub fn speed_factors(&self) -> &HashMap<HorseId, f64> {
        &self.speed_factors
    }

    /// Total paused time folded into the race so far.
    pub fn accumulated_pause(&self) -> Duration {
        self.accumulated_pause
    }

    /// Returns true while a pause is being measured.
    pub fn is_suspended(&self) -> bool {
        self.last_pause_start.is_some()
    }

    pub fn track_length(&self) -> f64 {
        self.track_length
    }
}
