//! Schema migrations.
//!
//! # Data Flow
//! ```text
//! migrations dir → source.rs (versioned up/down files)
//! driver url     → driver.rs (current version, script execution)
//!                → plan.rs (ordered steps for the command)
//!                → Migrator runs each step and records the new version
//! ```

pub mod driver;
pub mod plan;
pub mod source;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub use driver::{open, Driver, MemoryDriver};
pub use plan::{plan, Direction, Step, Target};
pub use source::{Migration, MigrationSource};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid migration name {0:?}: use letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("migration version {version} already exists")]
    Conflict { version: u64 },

    #[error("no migration with version {0}")]
    UnknownVersion(u64),

    #[error("migration {version} has no {direction} file")]
    MissingFile { version: u64, direction: Direction },

    #[error("invalid database url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no migration driver for scheme {0:?}")]
    UnsupportedDriver(String),

    #[error("system clock is before the unix epoch")]
    Clock,
}

impl MigrateError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Runs migration commands against one source and one driver.
pub struct Migrator {
    source: MigrationSource,
    driver: Box<dyn Driver>,
}

impl Migrator {
    pub fn new(source: MigrationSource, driver: Box<dyn Driver>) -> Self {
        Self { source, driver }
    }

    /// Create an empty up/down pair versioned with the current unix time.
    pub async fn create(&self, name: &str) -> Result<Migration, MigrateError> {
        let version = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| MigrateError::Clock)?
            .as_secs();
        let migration = self.source.create(name, version).await?;
        tracing::info!(version, name, dir = %self.source.dir().display(), "Created migration");
        Ok(migration)
    }

    pub async fn version(&self) -> Result<Option<u64>, MigrateError> {
        self.driver.version().await
    }

    pub async fn up(&self) -> Result<Vec<Step>, MigrateError> {
        self.migrate(Target::Latest).await
    }

    pub async fn down(&self) -> Result<Vec<Step>, MigrateError> {
        self.migrate(Target::Empty).await
    }

    pub async fn goto(&self, version: u64) -> Result<Vec<Step>, MigrateError> {
        self.migrate(Target::Version(version)).await
    }

    pub async fn next(&self, n: i64) -> Result<Vec<Step>, MigrateError> {
        self.migrate(Target::Relative(n)).await
    }

    /// Roll back the latest migration and apply it again.
    pub async fn redo(&self) -> Result<Vec<Step>, MigrateError> {
        let mut steps = self.migrate(Target::Relative(-1)).await?;
        if !steps.is_empty() {
            steps.extend(self.migrate(Target::Relative(1)).await?);
        }
        Ok(steps)
    }

    /// Roll back everything, then apply everything.
    pub async fn reset(&self) -> Result<Vec<Step>, MigrateError> {
        let mut steps = self.down().await?;
        steps.extend(self.up().await?);
        Ok(steps)
    }

    async fn migrate(&self, target: Target) -> Result<Vec<Step>, MigrateError> {
        let migrations = self.source.list().await?;
        let current = self.driver.version().await?;
        let steps = plan(&migrations, current, target)?;

        for step in &steps {
            let sql = tokio::fs::read_to_string(&step.file)
                .await
                .map_err(|e| MigrateError::io(&step.file, e))?;
            self.driver.apply(step, &sql).await?;
            tracing::info!(
                version = step.version,
                name = %step.name,
                direction = %step.direction,
                "Applied migration"
            );
        }

        if steps.is_empty() {
            tracing::info!(?current, "No change");
        }
        Ok(steps)
    }
}
