//! Gallop Deterministic Simulation Harness
//!
//! Runs the race engine on a virtual clock so whole programs play out in
//! milliseconds, reproducibly from a single seed.
//!
//! # Core Principle
//!
//! Every source of non-determinism is controlled:
//! - **Time**: the virtual clock advances one frame interval per tick
//! - **Randomness**: rosters, condition scores and speeds follow from the seed
//! - **Frames**: delivered only when the engine has a request outstanding
//!
//! After every frame the data-model invariants are checked.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   SimWorld                    │
//! │  ┌──────────────┐  frame   ┌───────────────┐  │
//! │  │  SimContext  │─────────►│  RaceProgram  │  │
//! │  │ (virtual clk)│          │ (gallop_core) │  │
//! │  └──────────────┘          └──────┬────────┘  │
//! │                                   │ events    │
//! │  ┌──────────────┐                 ▼           │
//! │  │  invariants  │◄──── check after each frame │
//! │  └──────────────┘                             │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gallop_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::FullProgram);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
pub mod invariants;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{HorsePosition, SimEvent, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{CheckedProgram, SimConfig, SimWorld};
