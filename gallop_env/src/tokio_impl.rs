//! Production implementation of FrameContext using Tokio.

use crate::FrameContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Default frame spacing, roughly one display refresh at 60 Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Production context backed by Tokio timers.
///
/// Time comes from the system clock; frames are paced by sleeping one
/// frame interval, so there is no hard rate guarantee.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Sleep between frames
    frame_interval: Duration,
}

impl TokioContext {
    /// Creates a new TokioContext paced at ~60 Hz.
    pub fn new() -> Self {
        Self::with_frame_interval(DEFAULT_FRAME_INTERVAL)
    }

    /// Creates a context with a custom frame interval.
    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            start: Instant::now(),
            frame_interval,
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn next_frame(&self) -> Duration {
        tokio::time::sleep(self.frame_interval).await;
        self.now()
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_context_frames_advance() {
        let ctx = TokioContext::with_frame_interval(Duration::from_millis(5));
        let t1 = ctx.now();
        let t2 = ctx.next_frame().await;

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(5));
    }

    #[test]
    fn test_tokio_context_defaults() {
        let ctx = TokioContext::default();
        assert_eq!(ctx.frame_interval(), DEFAULT_FRAME_INTERVAL);
        assert_eq!(ctx.seed(), 0);
    }
}
