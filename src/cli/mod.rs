//! Command line interface.
//!
//! `prest` with no subcommand serves the API. `prest migrate ...` manages
//! schema migrations and `prest version` prints the build version.

pub mod migrate;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::adapter::{self, UnknownAdapter};
use crate::config::{ConfigError, PrestConfig};
use crate::controllers::AppState;
use crate::http::{RouteComposer, RouteError, ServerLauncher};
use crate::lifecycle::{Shutdown, TaskError};
use crate::migrate::MigrateError;
use crate::net::ListenerError;
use crate::security::TablePolicy;

pub use migrate::{MigrateArgs, MigrateCommand};

#[derive(Debug, Parser)]
#[command(name = "prest")]
#[command(about = "Serve a RESTful API from any database", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "PREST_CONF")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute migration operations
    Migrate(MigrateArgs),
    /// Print the prest version
    Version,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Adapter(#[from] UnknownAdapter),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Serve(#[from] TaskError<ListenerError>),

    #[error(transparent)]
    Migrate(#[from] MigrateError),
}

impl Cli {
    pub async fn execute(self, config: PrestConfig) -> Result<(), CommandError> {
        match self.command {
            None => serve(Arc::new(config)).await,
            Some(Command::Migrate(args)) => args.run(&config).await,
            Some(Command::Version) => {
                println!("{}", version());
                Ok(())
            }
        }
    }
}

pub fn version() -> String {
    format!("prest {}", env!("CARGO_PKG_VERSION"))
}

/// Resolve the adapter, compose the router and run every listener.
pub async fn serve(config: Arc<PrestConfig>) -> Result<(), CommandError> {
    let adapter = adapter::resolve(config.adapter.as_deref())?;
    tracing::info!(adapter = adapter.name(), "Adapter loaded");

    let state = AppState::new(adapter, config.clone());
    let authorizer = Arc::new(TablePolicy::from_config(&config.access));
    let app = RouteComposer::new(state, authorizer).compose()?;

    ServerLauncher::new(config, app).run(Shutdown::new()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
