//! Simulation context implementing FrameContext with a virtual clock.

use async_trait::async_trait;
use gallop_env::FrameContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Simulation context backed by a virtual clock.
///
/// Time only moves when a frame is requested from it (`next_frame`/`step`)
/// or when the harness advances it explicitly, so a whole race program
/// plays out in microseconds of wall time.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<AtomicU64>,

    /// Virtual time between two frames
    frame_interval: Duration,

    /// Epoch offset (virtual time 0 maps to this wall-clock time)
    epoch: SystemTime,
}

impl SimContext {
    /// Creates a context running at 60 frames per second.
    pub fn new(seed: u64) -> Self {
        Self::with_fps(seed, 60)
    }

    /// Creates a context running at `fps` frames per second.
    pub fn with_fps(seed: u64, fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            seed,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            frame_interval: Duration::from_nanos(1_000_000_000 / u64::from(fps)),
            epoch: UNIX_EPOCH + Duration::from_secs(1704067200), // 2024-01-01 00:00:00 UTC
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64, fps: u32) -> Arc<Self> {
        Arc::new(Self::with_fps(seed, fps))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Sets the virtual time to a specific value.
    pub fn set_time(&self, time_ns: u64) {
        self.virtual_time_ns.store(time_ns, Ordering::SeqCst);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::SeqCst)
    }

    /// Advances one frame interval and returns the new timestamp.
    pub fn step(&self) -> Duration {
        self.advance_time(self.frame_interval);
        self.now()
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            frame_interval: self.frame_interval,
            epoch: self.epoch,
        }
    }
}

#[async_trait]
impl FrameContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    async fn next_frame(&self) -> Duration {
        // In simulation the frame arrives immediately
        self.step()
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
