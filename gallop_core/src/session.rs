//! Session and round-indexed race records.

use crate::horse::Horse;
use crate::lifecycle::{Lifecycle, RaceState};
use crate::outcome::RaceResult;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Session identifier. Strictly increasing across program generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Returns the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One race event in a generated program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// "Race {id} - {distance}m"
    pub name: String,

    /// Meters
    pub distance: u32,

    /// Roster, sampled without replacement
    pub horses: Vec<Horse>,

    /// Ranked results; empty until completion
    pub results: Vec<RaceResult>,

    #[serde(flatten)]
    pub lifecycle: Lifecycle,

    pub created_at: SystemTime,
}

impl Session {
    pub fn state(&self) -> RaceState {
        self.lifecycle.state()
    }

    pub fn is_completed(&self) -> bool {
        self.lifecycle.is_completed()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.lifecycle.is_paused()
    }

    /// Stores the results and moves to the terminal state.
    pub fn complete(&mut self, results: Vec<RaceResult>) {
        self.results = results;
        self.lifecycle.complete();
    }

    /// Horse that finished first, if the session has results.
    pub fn winner(&self) -> Option<&RaceResult> {
        self.results.first()
    }
}

/// Round-indexed race, used by the instant-resolve surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    /// 1-based round number, equal to the slot index + 1
    pub round: u32,
    pub distance: u32,
    pub horses: Vec<Horse>,
    pub results: Vec<RaceResult>,

    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Race {
    pub fn new(round: u32, distance: u32, horses: Vec<Horse>) -> Self {
        Self {
            round,
            distance,
            horses,
            results: Vec::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn state(&self) -> RaceState {
        self.lifecycle.state()
    }

    pub fn is_completed(&self) -> bool {
        self.lifecycle.is_completed()
    }

    /// Stores the results and moves to the terminal state.
    pub fn complete(&mut self, results: Vec<RaceResult>) {
        self.results = results;
        self.lifecycle.complete();
    }
}
