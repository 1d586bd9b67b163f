//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::PrestConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "prest.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PREST_CONF";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration the way the binary does: file, then environment, then validation.
///
/// The file is `explicit` if given, else the one named by `PREST_CONF`, else
/// `./prest.toml` when it exists. Without any file the defaults are used.
pub fn load(explicit: Option<&Path>) -> Result<PrestConfig, ConfigError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

    let mut config = match path {
        Some(path) => read_config(&path)?,
        None => PrestConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file, without environment overrides.
pub fn load_config(path: &Path) -> Result<PrestConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<PrestConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Override file values with `PREST_*` variables resolved through `lookup`.
pub fn apply_env<F>(config: &mut PrestConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("PREST_HTTP_HOST") {
        config.http.host = v;
    }
    // PORT is what most PaaS runtimes inject; the prest-specific name wins.
    if let Some(v) = lookup("PREST_HTTP_PORT").or_else(|| lookup("PORT")) {
        config.http.port = parse("PREST_HTTP_PORT", v)?;
    }
    if let Some(v) = lookup("PREST_SOCKET_PATH") {
        config.http.socket_path = (!v.is_empty()).then(|| PathBuf::from(v));
    }
    if let Some(v) = lookup("PREST_CONTEXT") {
        config.http.context_path = v;
    }
    if let Some(v) = lookup("PREST_HTTPS_MODE") {
        config.https.mode = parse("PREST_HTTPS_MODE", v)?;
    }
    if let Some(v) = lookup("PREST_HTTPS_CERT") {
        config.https.cert = PathBuf::from(v);
    }
    if let Some(v) = lookup("PREST_HTTPS_KEY") {
        config.https.key = PathBuf::from(v);
    }
    if let Some(v) = lookup("PREST_DEBUG") {
        config.debug = parse("PREST_DEBUG", v)?;
    }
    if let Some(v) = lookup("PREST_ADAPTER") {
        config.adapter = (!v.is_empty()).then_some(v);
    }
    if let Some(v) = lookup("PREST_ACCESS_RESTRICT") {
        config.access.restrict = parse("PREST_ACCESS_RESTRICT", v)?;
    }
    if let Some(v) = lookup("PREST_PG_HOST") {
        config.pg.host = v;
    }
    if let Some(v) = lookup("PREST_PG_PORT") {
        config.pg.port = parse("PREST_PG_PORT", v)?;
    }
    if let Some(v) = lookup("PREST_PG_USER") {
        config.pg.user = v;
    }
    if let Some(v) = lookup("PREST_PG_PASS") {
        config.pg.pass = v;
    }
    if let Some(v) = lookup("PREST_PG_DATABASE") {
        config.pg.database = v;
    }
    if let Some(v) = lookup("PREST_SSL_MODE") {
        config.pg.ssl_mode = v;
    }
    if let Some(v) = lookup("PREST_MIGRATIONS") {
        config.migrations_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("PREST_QUERIES_LOCATION") {
        config.queries.location = PathBuf::from(v);
    }
    Ok(())
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
