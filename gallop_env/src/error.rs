//! Error types for the Gallop environment abstraction.

use thiserror::Error;

/// Errors that can occur while a host drives the engine.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The driver delivered its whole frame budget and the target still wants frames
    #[error("Frame budget exhausted after {0} frames")]
    FrameBudgetExhausted(u64),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a context error.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::ContextError(msg.into())
    }
}
