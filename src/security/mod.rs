//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request for /{database}/{schema}/{table} (or /batch/...):
//!     → access_control.rs (parse target table, ask the Authorizer)
//!     → allowed: CRUD handler
//!     → denied: 401, handler never runs
//! ```
//!
//! # Design Decisions
//! - Discovery routes are never wrapped by this layer
//! - The decision itself sits behind the `Authorizer` trait
//! - Public mode (restrict = false) allows every table

pub mod access_control;

pub use access_control::{
    AccessControlLayer, Authorizer, Denied, Permission, TableAccess, TablePolicy,
};
