//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, paths)
//! - Check that TLS material is named when HTTPS mode is on
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PrestConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::PrestConfig;
use crate::security::Permission;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("http.port must be non-zero")]
    ZeroPort,

    #[error("http.context_path must start with '/', got {0:?}")]
    ContextPath(String),

    #[error("https.mode is enabled but https.{0} is empty")]
    MissingTlsFile(&'static str),

    #[error("http.socket_path must not be empty")]
    EmptySocketPath,

    #[error("access table {table:?} has unknown permission {permission:?}")]
    UnknownPermission { table: String, permission: String },
}

pub fn validate_config(config: &PrestConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if !config.http.context_path.starts_with('/') {
        errors.push(ValidationError::ContextPath(config.http.context_path.clone()));
    }

    if config.https.mode {
        if config.https.cert.as_os_str().is_empty() {
            errors.push(ValidationError::MissingTlsFile("cert"));
        }
        if config.https.key.as_os_str().is_empty() {
            errors.push(ValidationError::MissingTlsFile("key"));
        }
    }

    if let Some(path) = &config.http.socket_path {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptySocketPath);
        }
    }

    for table in &config.access.tables {
        for permission in &table.permissions {
            if permission.parse::<Permission>().is_err() {
                errors.push(ValidationError::UnknownPermission {
                    table: table.name.clone(),
                    permission: permission.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
