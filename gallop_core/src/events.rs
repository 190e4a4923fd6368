//! Change notifications for the presentation layer.
//!
//! Subscribers get an unbounded Crossbeam receiver; the program publishes
//! after every state change a dashboard would re-render on. Dropped
//! receivers are pruned on the next publish.

use crate::outcome::RaceResult;
use crate::session::SessionId;
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::Serialize;

/// Something observable changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RaceEvent {
    /// A batch of sessions was appended
    ProgramGenerated { session_ids: Vec<SessionId> },

    /// The browsed session changed
    CurrentSessionChanged { id: Option<SessionId> },

    SessionStarted { id: SessionId },
    SessionPaused { id: SessionId },
    SessionResumed { id: SessionId },

    /// A session stored its results
    SessionCompleted {
        id: SessionId,
        winner: Option<RaceResult>,
    },

    /// No session left to animate
    AnimationIdle,

    /// A round-indexed race was resolved
    RaceRoundCompleted { round: u32 },

    /// Round-indexed races were rebuilt
    RacesReset,
}

/// Fan-out of events to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<Sender<RaceEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&mut self) -> Receiver<RaceEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&mut self, event: RaceEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
