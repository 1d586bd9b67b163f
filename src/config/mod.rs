//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! prest.toml (or --config / PREST_CONF)
//!     → loader.rs (parse & deserialize)
//!     → PREST_* environment overrides
//!     → validation.rs (semantic checks)
//!     → PrestConfig (validated, immutable)
//!     → shared via Arc to router, launcher and commands
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup and never mutated afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{AccessConfig, HttpConfig, HttpsConfig, PrestConfig, TableAccessConfig};
