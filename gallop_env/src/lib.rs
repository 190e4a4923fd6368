//! Gallop Environment Abstraction Layer
//!
//! The race engine never talks to a render loop or a wall clock directly.
//! Everything it needs from the host goes through this crate:
//! - Time (`now()`, `system_time()`)
//! - Frame pacing (`next_frame()`), one callback per rendered frame
//! - Frame requests that can be cancelled through a handle
//!
//! The same engine therefore runs under a real ~60 Hz clock (`TokioContext`)
//! and under a virtual clock in the simulation harness.
//!
//! # Example
//!
//! ```ignore
//! use gallop_env::{drive, TokioContext};
//!
//! let ctx = TokioContext::new();
//! program.start_all_races();
//! let frames = drive(&ctx, &mut program, 10_000).await?;
//! ```

mod context;
mod driver;
mod error;
mod frames;
mod tokio_impl;
mod types;

pub use context::FrameContext;
pub use driver::{drive, FrameDriven};
pub use error::EnvError;
pub use frames::FrameQueue;
pub use tokio_impl::TokioContext;
pub use types::FrameHandle;
