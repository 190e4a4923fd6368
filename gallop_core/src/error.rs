//! Error types for the race engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies the race an operation addressed, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceRef {
    /// Round-indexed race (1-based)
    Round(u32),
}

impl std::fmt::Display for RaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaceRef::Round(round) => write!(f, "Race round {}", round),
        }
    }
}

/// A lifecycle guard that rejected a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("is not running")]
    NotRunning,

    #[error("has already been completed")]
    AlreadyCompleted,
}

/// Errors raised by the instant-resolve and round-indexed operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RaceError {
    /// No race backs the given round
    #[error("{0} not found")]
    NotFound(RaceRef),

    /// Lifecycle guard violated
    #[error("{target} {reason}")]
    InvalidTransition {
        target: RaceRef,
        reason: TransitionError,
    },

    /// The horse pool can't fill a roster
    #[error("Horse pool has {available} horses, {requested} requested")]
    InsufficientHorses { requested: usize, available: usize },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RaceError {
    /// Creates a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wraps a rejected transition for the given race.
    pub fn transition(target: RaceRef, reason: TransitionError) -> Self {
        Self::InvalidTransition { target, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RaceError::NotFound(RaceRef::Round(1)).to_string(),
            "Race round 1 not found"
        );
        assert_eq!(
            RaceError::transition(RaceRef::Round(2), TransitionError::NotRunning).to_string(),
            "Race round 2 is not running"
        );
        assert_eq!(
            RaceError::transition(RaceRef::Round(7), TransitionError::AlreadyCompleted).to_string(),
            "Race round 7 has already been completed"
        );
    }
}
