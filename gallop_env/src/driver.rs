//! Host-side frame loop.
//!
//! ```text
//! Host (FrameContext)            Target (FrameDriven)
//!   |                                  |
//!   |<---------- wants_frame()? -------|
//!   |-- next_frame().await             |
//!   |-- on_frame(timestamp) ---------->|-- advance, maybe request again
//!   |   ... until wants_frame() == false
//! ```

use crate::context::FrameContext;
use crate::error::EnvError;
use std::time::Duration;

/// Something that consumes animation frames.
///
/// The target decides whether it needs another frame (it has a pending
/// request); the host decides when that frame happens.
pub trait FrameDriven {
    /// Returns true if a frame request is outstanding.
    fn wants_frame(&self) -> bool;

    /// Runs one frame callback at the given monotonic timestamp.
    fn on_frame(&mut self, timestamp: Duration);
}

/// Delivers frames to `target` until it stops asking for them.
///
/// # Returns
/// * `Ok(frames)` - Number of frames delivered
/// * `Err(EnvError::FrameBudgetExhausted)` - `max_frames` delivered and the target still wants more
/// * `Err(EnvError::ContextError)` - The context produced a timestamp earlier than the previous one
pub async fn drive<C, T>(ctx: &C, target: &mut T, max_frames: u64) -> Result<u64, EnvError>
where
    C: FrameContext,
    T: FrameDriven + ?Sized,
{
    let mut frames = 0u64;
    let mut last = ctx.now();

    while target.wants_frame() {
        if frames >= max_frames {
            return Err(EnvError::FrameBudgetExhausted(frames));
        }

        let timestamp = ctx.next_frame().await;
        if timestamp < last {
            return Err(EnvError::context(format!(
                "frame clock went backwards ({:?} < {:?})",
                timestamp, last
            )));
        }
        last = timestamp;

        target.on_frame(timestamp);
        frames += 1;
    }

    Ok(frames)
}
