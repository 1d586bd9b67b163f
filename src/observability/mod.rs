//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems emit tracing events with structured fields
//!     → logging.rs (EnvFilter + fmt layer on stdout)
//! HTTP requests
//!     → tower_http TraceLayer spans, tagged with x-request-id
//! ```

pub mod logging;
