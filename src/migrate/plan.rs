//! Migration planning.
//!
//! Given the migrations on disk and the version recorded by the driver,
//! compute the ordered steps for each command. Applied migrations are those
//! with a version at or below the current one.

use std::fmt;
use std::path::PathBuf;

use super::source::Migration;
use super::MigrateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Where a plan should leave the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every migration applied.
    Latest,
    /// No migration applied.
    Empty,
    /// Exactly the migrations up to this version applied.
    Version(u64),
    /// `n` migrations forward (positive) or back (negative).
    Relative(i64),
}

/// A single script to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub version: u64,
    pub name: String,
    pub direction: Direction,
    pub file: PathBuf,
    /// Version to record once the step has run.
    pub version_after: Option<u64>,
}

pub fn plan(migrations: &[Migration], current: Option<u64>, target: Target) -> Result<Vec<Step>, MigrateError> {
    let applied: Vec<&Migration> = migrations
        .iter()
        .filter(|m| current.is_some_and(|c| m.version <= c))
        .collect();
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| current.map_or(true, |c| m.version > c))
        .collect();

    match target {
        Target::Latest => up_steps(&pending),
        Target::Empty => down_steps(&applied, applied.len()),
        Target::Version(version) => {
            if !migrations.iter().any(|m| m.version == version) {
                return Err(MigrateError::UnknownVersion(version));
            }
            match current {
                Some(c) if version < c => {
                    let count = applied.iter().filter(|m| m.version > version).count();
                    down_steps(&applied, count)
                }
                Some(c) if version == c => Ok(Vec::new()),
                _ => {
                    let count = pending.iter().filter(|m| m.version <= version).count();
                    up_steps(&pending[..count])
                }
            }
        }
        Target::Relative(n) if n >= 0 => {
            let count = usize::try_from(n).unwrap_or(usize::MAX).min(pending.len());
            up_steps(&pending[..count])
        }
        Target::Relative(n) => {
            let count = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
            down_steps(&applied, count.min(applied.len()))
        }
    }
}

fn up_steps(pending: &[&Migration]) -> Result<Vec<Step>, MigrateError> {
    pending
        .iter()
        .map(|m| step(m, Direction::Up, Some(m.version)))
        .collect()
}

/// The last `count` applied migrations, newest first.
fn down_steps(applied: &[&Migration], count: usize) -> Result<Vec<Step>, MigrateError> {
    (0..count)
        .map(|i| {
            let idx = applied.len() - 1 - i;
            let previous = idx.checked_sub(1).map(|p| applied[p].version);
            step(applied[idx], Direction::Down, previous)
        })
        .collect()
}

fn step(migration: &Migration, direction: Direction, version_after: Option<u64>) -> Result<Step, MigrateError> {
    let file = migration
        .file(direction)
        .ok_or(MigrateError::MissingFile {
            version: migration.version,
            direction,
        })?
        .to_path_buf();
    Ok(Step {
        version: migration.version,
        name: migration.name.clone(),
        direction,
        file,
        version_after,
    })
}
