//! Gallop Core - Horse-Racing Program Engine
//!
//! Owns everything with real behaviour behind a racing dashboard:
//! 1. **Registry**: the pool of horses and their condition scores
//! 2. **Factory**: race programs built from random rosters
//! 3. **Outcome**: finish times and rankings
//! 4. **Lifecycle**: start/pause/resume/complete guards per session
//! 5. **Animation**: frame-by-frame positions with pause accounting
//! 6. **Program**: the orchestrator the presentation layer talks to

pub mod animation;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod horse;
pub mod lifecycle;
pub mod outcome;
pub mod program;
pub mod session;

// Re-export key types for convenience
pub use animation::{FrameOutcome, RaceAnimator};
pub use config::ProgramConfig;
pub use error::{RaceError, RaceRef, TransitionError};
pub use events::{EventHub, RaceEvent};
pub use horse::{Horse, HorseId, HorseRegistry, NewHorse};
pub use lifecycle::{Lifecycle, RaceState};
pub use outcome::RaceResult;
pub use program::RaceProgram;
pub use session::{Race, Session, SessionId};
