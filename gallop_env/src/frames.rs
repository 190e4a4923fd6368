//! Cooperative, cancellable frame requests.
//!
//! Mirrors the "schedule a callback before the next render pass" primitive
//! of a UI host: a consumer requests a frame and gets a handle back, the
//! host later takes the pending request and runs exactly one callback for it.
//! Only one request is outstanding at a time; requesting again while a frame
//! is pending returns the pending handle.

use crate::types::FrameHandle;

/// Single-slot frame request queue.
#[derive(Debug, Default)]
pub struct FrameQueue {
    /// Next handle value to hand out
    next_handle: u64,

    /// Outstanding request, if any
    pending: Option<FrameHandle>,

    /// Total frames requested over the queue's lifetime
    requested: u64,

    /// Total requests cancelled before the host took them
    cancelled: u64,
}

impl FrameQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a frame, returning the handle of the outstanding request.
    pub fn request(&mut self) -> FrameHandle {
        if let Some(handle) = self.pending {
            return handle;
        }
        self.next_handle += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    /// Cancels the request identified by `handle`.
    ///
    /// Returns false when the handle is stale (already taken or cancelled).
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
            true
        } else {
            false
        }
    }

    /// Cancels whatever request is outstanding.
    pub fn cancel_pending(&mut self) -> Option<FrameHandle> {
        let handle = self.pending?;
        self.cancel(handle);
        Some(handle)
    }

    /// Takes the outstanding request so the host can run its callback.
    pub fn take(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    /// Returns the outstanding request without consuming it.
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Returns true if a frame is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Total frames requested.
    pub fn requested_count(&self) -> u64 {
        self.requested
    }

    /// Total requests cancelled.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}
