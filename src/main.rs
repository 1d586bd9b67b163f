//! prest
//!
//! Serve a RESTful API from a database.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net (TCP / TLS / Unix socket listeners)
//!                       │
//!                       ▼
//!                     http::middleware (request id, tracing, panics)
//!                       │
//!                       ▼
//!                     http::router ── discovery routes ──▶ controllers
//!                       │
//!                       └─ security::access_control ─▶ CRUD controllers
//!                                                          │
//!                                                          ▼
//!                                                       adapter
//!
//!     Cross-cutting: config, lifecycle (shutdown, task group), observability
//! ```

use std::process::ExitCode;

use clap::Parser;

use prest::cli::Cli;
use prest::{config, observability};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    observability::logging::init(config.debug);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "prest starting");

    match cli.execute(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
