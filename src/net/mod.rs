//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! PrestConfig
//!     → listener.rs (ListenerSpec per endpoint, socket first)
//!     → unix.rs (clear stale socket entry) / tls.rs (load PEM pair)
//!     → bound Listener
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - The socket path is always cleared before binding

pub mod listener;
pub mod tls;
pub mod unix;

pub use listener::{Listener, ListenerError, ListenerSpec};
pub use tls::TlsPaths;
