//! Error types for the simulation harness.

use gallop_core::RaceError;
use gallop_env::EnvError;
use thiserror::Error;

/// Failures while setting up, running or exporting a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The engine rejected an operation
    #[error("Program error: {0}")]
    Program(#[from] RaceError),

    /// The frame host failed
    #[error("Host error: {0}")]
    Env(#[from] EnvError),

    /// A data-model invariant broke after a frame
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// A scenario expectation did not hold
    #[error("Check failed: {0}")]
    Check(String),

    /// The program kept asking for frames past the budget
    #[error("Frame budget exhausted after {0} frames")]
    FrameBudgetExhausted(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Creates an invariant violation.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Creates a failed scenario check.
    pub fn check(msg: impl Into<String>) -> Self {
        Self::Check(msg.into())
    }
}
