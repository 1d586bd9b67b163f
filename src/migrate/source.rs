//! Migration files on disk.
//!
//! Files are named `{version}_{name}.up.sql` and `{version}_{name}.down.sql`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::plan::Direction;
use super::MigrateError;

/// One version with its up and down scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: u64,
    pub name: String,
    pub up: Option<PathBuf>,
    pub down: Option<PathBuf>,
}

impl Migration {
    pub fn file(&self, direction: Direction) -> Option<&Path> {
        match direction {
            Direction::Up => self.up.as_deref(),
            Direction::Down => self.down.as_deref(),
        }
    }
}

/// A migrations directory.
#[derive(Debug, Clone)]
pub struct MigrationSource {
    dir: PathBuf,
}

impl MigrationSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All migrations, ascending by version. A missing directory has none.
    pub async fn list(&self) -> Result<Vec<Migration>, MigrateError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MigrateError::io(&self.dir, e)),
        };

        let mut by_version: BTreeMap<u64, Migration> = BTreeMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MigrateError::io(&self.dir, e))?
        {
            let file_name = entry.file_name();
            let Some((version, name, direction)) = file_name.to_str().and_then(parse_file_name) else {
                continue;
            };

            let migration = by_version.entry(version).or_insert_with(|| Migration {
                version,
                name: name.clone(),
                up: None,
                down: None,
            });
            if migration.name != name {
                return Err(MigrateError::Conflict { version });
            }
            let slot = match direction {
                Direction::Up => &mut migration.up,
                Direction::Down => &mut migration.down,
            };
            *slot = Some(entry.path());
        }

        Ok(by_version.into_values().collect())
    }

    /// Write an empty up/down pair for `name` at `version`.
    pub async fn create(&self, name: &str, version: u64) -> Result<Migration, MigrateError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(MigrateError::InvalidName(name.to_string()));
        }
        if self.list().await?.iter().any(|m| m.version == version) {
            return Err(MigrateError::Conflict { version });
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MigrateError::io(&self.dir, e))?;

        let up = self.dir.join(format!("{version}_{name}.up.sql"));
        let down = self.dir.join(format!("{version}_{name}.down.sql"));
        for path in [&up, &down] {
            tokio::fs::write(path, "")
                .await
                .map_err(|e| MigrateError::io(path, e))?;
        }

        Ok(Migration {
            version,
            name: name.to_string(),
            up: Some(up),
            down: Some(down),
        })
    }
}

fn parse_file_name(file_name: &str) -> Option<(u64, String, Direction)> {
    let stem = file_name.strip_suffix(".sql")?;
    let (rest, direction) = if let Some(rest) = stem.strip_suffix(".up") {
        (rest, Direction::Up)
    } else {
        (stem.strip_suffix(".down")?, Direction::Down)
    };
    let (version, name) = rest.split_once('_')?;
    Some((version.parse().ok()?, name.to_string(), direction))
}
