//! Database adapter subsystem.
//!
//! # Data Flow
//! ```text
//! Controller (path params, query string, JSON body)
//!     → Adapter trait method
//!     → JSON value or AdapterError
//!     → AdapterError::into_response (status + {"error": ...})
//! ```
//!
//! # Design Decisions
//! - Controllers only ever see `Arc<dyn Adapter>`
//! - Adapters are selected by name at startup; `memory` is the default
//! - Query-string pairs are passed through untouched as `Filters`

pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

pub use memory::MemoryAdapter;

/// Name of the adapter used when none is configured.
pub const DEFAULT_ADAPTER: &str = "memory";

/// Query-string pairs of a request.
pub type Filters = BTreeMap<String, String>;

/// The `{database}/{schema}/{table}` a CRUD request targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

/// Errors an adapter may report to the HTTP layer.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} is not supported by this adapter")]
    Unsupported(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdapterError::NotFound(_) => StatusCode::NOT_FOUND,
            AdapterError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdapterError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            AdapterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Adapter request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Requested adapter name is not registered.
#[derive(Debug, Error)]
#[error("unknown adapter {0:?}")]
pub struct UnknownAdapter(pub String);

/// Backend the resource controllers delegate to.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Registered name, used in logs.
    fn name(&self) -> &'static str;

    async fn databases(&self) -> Result<Vec<Value>, AdapterError>;

    async fn schemas(&self) -> Result<Vec<Value>, AdapterError>;

    async fn tables(&self) -> Result<Vec<Value>, AdapterError>;

    async fn tables_by_database_and_schema(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<Value>, AdapterError>;

    async fn select(&self, target: &TableRef, filters: &Filters) -> Result<Vec<Value>, AdapterError>;

    async fn insert(&self, target: &TableRef, row: Value) -> Result<Value, AdapterError>;

    async fn batch_insert(&self, target: &TableRef, rows: Vec<Value>) -> Result<Vec<Value>, AdapterError>;

    /// Returns the number of deleted rows.
    async fn delete(&self, target: &TableRef, filters: &Filters) -> Result<u64, AdapterError>;

    /// Returns the number of updated rows.
    async fn update(&self, target: &TableRef, filters: &Filters, changes: Value) -> Result<u64, AdapterError>;

    /// Run an already rendered script.
    async fn execute_script(&self, method: &Method, sql: &str) -> Result<Value, AdapterError>;
}

/// Instantiate a registered adapter by name.
pub fn load(name: &str) -> Result<Arc<dyn Adapter>, UnknownAdapter> {
    match name {
        "memory" => Ok(Arc::new(MemoryAdapter::new())),
        other => Err(UnknownAdapter(other.to_string())),
    }
}

/// Load the configured adapter, falling back to the default when none is set.
pub fn resolve(configured: Option<&str>) -> Result<Arc<dyn Adapter>, UnknownAdapter> {
    match configured {
        Some(name) => load(name),
        None => {
            tracing::warn!("adapter is not set. Using the default ({})", DEFAULT_ADAPTER);
            load(DEFAULT_ADAPTER)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_default() {
        let adapter = resolve(None).unwrap();
        assert_eq!(adapter.name(), DEFAULT_ADAPTER);
    }

    #[test]
    fn resolve_rejects_unknown_names() {
        let err = resolve(Some("oracle")).err().unwrap();
        assert_eq!(err.to_string(), "unknown adapter \"oracle\"");
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(AdapterError::NotFound("t".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AdapterError::BadRequest("b".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AdapterError::Unsupported("x").status(), StatusCode::NOT_IMPLEMENTED);
    }
}
