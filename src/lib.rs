//! prest: a RESTful API served from a database.

pub mod adapter;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod http;
pub mod lifecycle;
pub mod migrate;
pub mod net;
pub mod observability;
pub mod security;

pub use config::PrestConfig;
pub use http::{RouteComposer, ServerLauncher};
pub use lifecycle::Shutdown;
