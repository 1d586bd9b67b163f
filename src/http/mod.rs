//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! bound Listener (TCP, TLS or Unix socket)
//!     → server.rs (one task per listener, shared shutdown)
//!     → middleware.rs (request id, tracing, panic recovery)
//!     → router.rs (discovery routes, else access control → CRUD routes)
//!     → controllers (adapter calls)
//! ```

pub mod middleware;
pub mod router;
pub mod server;

pub use middleware::X_REQUEST_ID;
pub use router::{RouteComposer, RouteError, RouteTable};
pub use server::ServerLauncher;
