//! Common types for the Gallop environment abstraction.

use serde::{Deserialize, Serialize};

/// Handle to a requested animation frame.
///
/// Handles are never reused within one `FrameQueue`, so a stale handle
/// can't cancel a newer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameHandle(pub u64);

impl FrameHandle {
    /// Returns the raw handle value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}
