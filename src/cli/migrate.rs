use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::CommandError;
use crate::config::PrestConfig;
use crate::migrate::{self, MigrationSource, Migrator, Step};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Database driver url (defaults to the one built from the pg settings)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Migrations directory (defaults to `migrations_path`)
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Create new up/down migration files
    Create { name: String },
    /// Roll back every applied migration
    Down,
    /// Migrate up or down to a version
    Goto { version: u64 },
    /// Print the current migration version
    Mversion,
    /// Apply (n > 0) or roll back (n < 0) n migrations
    Next {
        #[arg(allow_hyphen_values = true)]
        n: i64,
    },
    /// Roll back the latest migration and apply it again
    Redo,
    /// Apply every pending migration
    Up,
    /// Roll back everything, then apply everything
    Reset,
}

impl MigrateArgs {
    pub async fn run(self, config: &PrestConfig) -> Result<(), CommandError> {
        let url = self.url.unwrap_or_else(|| config.driver_url());
        let path = self.path.unwrap_or_else(|| config.migrations_path.clone());

        let migrator = Migrator::new(MigrationSource::new(&path), migrate::open(&url)?);
        tracing::debug!(path = %path.display(), "Migrations directory");

        let steps = match self.command {
            MigrateCommand::Create { name } => {
                let created = migrator.create(&name).await?;
                for file in [created.up, created.down].into_iter().flatten() {
                    println!("{}", file.display());
                }
                return Ok(());
            }
            MigrateCommand::Mversion => {
                match migrator.version().await? {
                    Some(version) => println!("{version}"),
                    None => println!("none"),
                }
                return Ok(());
            }
            MigrateCommand::Down => migrator.down().await?,
            MigrateCommand::Goto { version } => migrator.goto(version).await?,
            MigrateCommand::Next { n } => migrator.next(n).await?,
            MigrateCommand::Redo => migrator.redo().await?,
            MigrateCommand::Up => migrator.up().await?,
            MigrateCommand::Reset => migrator.reset().await?,
        };

        report(&steps);
        Ok(())
    }
}

fn report(steps: &[Step]) {
    for step in steps {
        println!("{} {}_{} ({})", step.direction, step.version, step.name, step.file.display());
    }
}
