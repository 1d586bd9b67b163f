//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Resolve adapter → Compose router → Spawn listeners
//!
//! Shutdown (shutdown.rs):
//!     Trigger → listeners stop accepting → drain in-flight requests → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown
//!
//! Task group (task_group.rs):
//!     first listener to end (error or not) → trigger shutdown → join rest
//! ```
//!
//! # Design Decisions
//! - No listener outlives its siblings
//! - The first error decides the exit status

pub mod shutdown;
pub mod signals;
pub mod task_group;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use task_group::{TaskError, TaskGroup};
