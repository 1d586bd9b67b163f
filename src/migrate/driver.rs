//! Database drivers for migrations.

use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use super::plan::Step;
use super::MigrateError;

/// Applies migration scripts and tracks the current version.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Last applied version, `None` when nothing has run.
    async fn version(&self) -> Result<Option<u64>, MigrateError>;

    /// Run one script and record `step.version_after`.
    async fn apply(&self, step: &Step, sql: &str) -> Result<(), MigrateError>;
}

/// Open the driver for `url`. Only `memory://` is built in.
pub fn open(url: &str) -> Result<Box<dyn Driver>, MigrateError> {
    let parsed = Url::parse(url).map_err(|source| MigrateError::InvalidUrl {
        url: redact(url),
        source,
    })?;
    match parsed.scheme() {
        "memory" => Ok(Box::new(MemoryDriver::default())),
        other => Err(MigrateError::UnsupportedDriver(other.to_string())),
    }
}

/// Strip the password so urls can be logged.
fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("xxxxx"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Keeps the version and a log of applied scripts for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    version: Option<u64>,
    history: Vec<Step>,
}

impl MemoryDriver {
    pub fn at(version: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                version: Some(version),
                history: Vec::new(),
            }),
        }
    }

    /// Steps applied so far, oldest first.
    pub fn history(&self) -> Vec<Step> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn version(&self) -> Result<Option<u64>, MigrateError> {
        Ok(self.lock().version)
    }

    async fn apply(&self, step: &Step, _sql: &str) -> Result<(), MigrateError> {
        let mut state = self.lock();
        state.version = step.version_after;
        state.history.push(step.clone());
        Ok(())
    }
}
