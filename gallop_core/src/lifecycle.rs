//! Session lifecycle state machine.
//!
//! ```text
//!            start            pause
//!  Pending ────────► Running ───────► Paused
//!                      │  ▲  resume     │
//!                      │  └─────────────┘
//!                      ▼ complete       │ complete
//!                  Completed ◄──────────┘   (terminal)
//! ```
//!
//! The three flags are stored exactly as the presentation layer reads them.
//! Every transition goes through this type so `paused ⇒ running` and
//! `running ⇒ !completed` hold.

use crate::error::TransitionError;
use serde::{Deserialize, Serialize};

/// Derived lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceState {
    Pending,
    Running,
    Paused,
    Completed,
}

impl std::fmt::Display for RaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RaceState::Pending => "pending",
            RaceState::Running => "running",
            RaceState::Paused => "paused",
            RaceState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Lifecycle flags shared by sessions and round-indexed races.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    is_completed: bool,
    is_running: bool,
    is_paused: bool,
}

impl Lifecycle {
    /// A fresh, pending lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Current state derived from the flags.
    pub fn state(&self) -> RaceState {
        if self.is_completed {
            RaceState::Completed
        } else if !self.is_running {
            RaceState::Pending
        } else if self.is_paused {
            RaceState::Paused
        } else {
            RaceState::Running
        }
    }

    /// Starts (or restarts) running. Rejected once completed.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.is_completed {
            return Err(TransitionError::AlreadyCompleted);
        }
        self.is_running = true;
        self.is_paused = false;
        Ok(())
    }

    /// Pauses a running race.
    pub fn pause(&mut self) -> Result<(), TransitionError> {
        if !self.is_running {
            return Err(TransitionError::NotRunning);
        }
        if self.is_completed {
            return Err(TransitionError::AlreadyCompleted);
        }
        self.is_paused = true;
        Ok(())
    }

    /// Resumes a running race. A race that isn't paused stays running.
    pub fn resume(&mut self) -> Result<(), TransitionError> {
        if !self.is_running {
            return Err(TransitionError::NotRunning);
        }
        self.is_paused = false;
        Ok(())
    }

    /// Moves to the terminal state from anywhere.
    pub fn complete(&mut self) {
        self.is_completed = true;
        self.is_running = false;
        self.is_paused = false;
    }

    /// Start/resume/pause depending on the current state.
    ///
    /// Returns the state after the toggle; completed races are left alone.
    pub fn toggle(&mut self) -> RaceState {
        let outcome = match self.state() {
            RaceState::Completed => Ok(()),
            RaceState::Pending => self.start(),
            RaceState::Paused => self.resume(),
            RaceState::Running => self.pause(),
        };
        debug_assert!(outcome.is_ok(), "toggle only takes guarded transitions");
        self.state()
    }
}

#[cfg(test)]
impl Lifecycle {
    /// Builds arbitrary flag combinations, including ones the guards prevent.
    pub(crate) fn from_flags(is_completed: bool, is_running: bool, is_paused: bool) -> Self {
        Self {
            is_completed,
            is_running,
            is_paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lifecycle_is_pending() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), RaceState::Pending);
        assert!(!lifecycle.is_running());
        assert!(!lifecycle.is_paused());
        assert!(!lifecycle.is_completed());
    }

    #[test]
    fn test_start_pause_resume_complete() {
        let mut lifecycle = Lifecycle::new();

        lifecycle.start().unwrap();
        assert_eq!(lifecycle.state(), RaceState::Running);

        lifecycle.pause().unwrap();
        assert_eq!(lifecycle.state(), RaceState::Paused);
        assert!(lifecycle.is_running());

        lifecycle.resume().unwrap();
        assert_eq!(lifecycle.state(), RaceState::Running);

        lifecycle.complete();
        assert_eq!(lifecycle.state(), RaceState::Completed);
        assert!(!lifecycle.is_running());
        assert!(!lifecycle.is_paused());
    }

    #[test]
    fn test_start_clears_pause() {
        let mut lifecycle = Lifecycle::from_flags(false, false, true);
        lifecycle.start().unwrap();
        assert!(!lifecycle.is_paused());
    }

    #[test]
    fn test_guards() {
        let mut pending = Lifecycle::new();
        assert_eq!(pending.pause(), Err(TransitionError::NotRunning));
        assert_eq!(pending.resume(), Err(TransitionError::NotRunning));

        let mut completed = Lifecycle::new();
        completed.complete();
        assert_eq!(completed.start(), Err(TransitionError::AlreadyCompleted));
        assert_eq!(completed.pause(), Err(TransitionError::NotRunning));

        // Inconsistent flags still report the completed guard on pause.
        let mut stale = Lifecycle::from_flags(true, true, false);
        assert_eq!(stale.pause(), Err(TransitionError::AlreadyCompleted));
    }

    #[test]
    fn test_complete_from_any_state() {
        for mut lifecycle in [
            Lifecycle::new(),
            Lifecycle::from_flags(false, true, false),
            Lifecycle::from_flags(false, true, true),
        ] {
            lifecycle.complete();
            assert_eq!(lifecycle.state(), RaceState::Completed);
        }
    }

    #[test]
    fn test_toggle_cycle() {
        let mut lifecycle = Lifecycle::new();

        assert_eq!(lifecycle.toggle(), RaceState::Running);
        assert_eq!(lifecycle.toggle(), RaceState::Paused);
        assert_eq!(lifecycle.toggle(), RaceState::Running);

        lifecycle.complete();
        assert_eq!(lifecycle.toggle(), RaceState::Completed);
    }
}
