//! Core environment context trait for the race engine host.

use async_trait::async_trait;
use std::time::{Duration, SystemTime};

/// The central interface for host interaction.
///
/// This trait abstracts the render loop so the race engine can run
/// against a real clock (tokio) or a virtual one (simulation harness).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, paced at ~60 Hz
/// - **Simulation**: `SimContext` - virtual clock advanced one frame at a time
///
/// # Monotonicity
///
/// Timestamps returned by `now()` and `next_frame()` never go backwards.
/// The animation scheduler computes elapsed race time from them.
#[async_trait]
pub trait FrameContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time, used for record timestamps.
    fn system_time(&self) -> SystemTime;

    /// Suspends until the next render pass and returns its timestamp.
    ///
    /// In production: sleeps one frame interval.
    /// In simulation: advances the virtual clock by one frame interval.
    async fn next_frame(&self) -> Duration;

    /// Nominal spacing between two frames.
    fn frame_interval(&self) -> Duration;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
