//! Resource controllers.
//!
//! Thin axum handlers: extract path, query and body, call the adapter,
//! shape the JSON response. Route wiring lives in `http::router`.

pub mod scripts;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::adapter::{Adapter, AdapterError, Filters, TableRef};
use crate::config::PrestConfig;

pub use scripts::execute_from_scripts;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn Adapter>,
    pub config: Arc<PrestConfig>,
}

impl AppState {
    pub fn new(adapter: Arc<dyn Adapter>, config: Arc<PrestConfig>) -> Self {
        Self { adapter, config }
    }
}

type JsonResult = Result<Json<Value>, AdapterError>;

pub async fn get_databases(State(state): State<AppState>) -> JsonResult {
    Ok(Json(Value::Array(state.adapter.databases().await?)))
}

pub async fn get_schemas(State(state): State<AppState>) -> JsonResult {
    Ok(Json(Value::Array(state.adapter.schemas().await?)))
}

pub async fn get_tables(State(state): State<AppState>) -> JsonResult {
    Ok(Json(Value::Array(state.adapter.tables().await?)))
}

pub async fn get_tables_by_database_and_schema(
    State(state): State<AppState>,
    Path((database, schema)): Path<(String, String)>,
) -> JsonResult {
    let tables = state
        .adapter
        .tables_by_database_and_schema(&database, &schema)
        .await?;
    Ok(Json(Value::Array(tables)))
}

pub async fn select_from_tables(
    State(state): State<AppState>,
    Path(target): Path<TableRef>,
    Query(filters): Query<Filters>,
) -> JsonResult {
    let rows = state.adapter.select(&target, &filters).await?;
    Ok(Json(Value::Array(rows)))
}

pub async fn insert_in_tables(
    State(state): State<AppState>,
    Path(target): Path<TableRef>,
    Json(row): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AdapterError> {
    let inserted = state.adapter.insert(&target, row).await?;
    tracing::debug!(table = %target.table, "Row inserted");
    Ok((StatusCode::CREATED, Json(inserted)))
}

pub async fn batch_insert_in_tables(
    State(state): State<AppState>,
    Path(target): Path<TableRef>,
    Json(rows): Json<Vec<Value>>,
) -> Result<(StatusCode, Json<Value>), AdapterError> {
    let count = rows.len();
    let inserted = state.adapter.batch_insert(&target, rows).await?;
    tracing::debug!(table = %target.table, rows = count, "Batch inserted");
    Ok((StatusCode::CREATED, Json(Value::Array(inserted))))
}

pub async fn delete_from_table(
    State(state): State<AppState>,
    Path(target): Path<TableRef>,
    Query(filters): Query<Filters>,
) -> JsonResult {
    let affected = state.adapter.delete(&target, &filters).await?;
    Ok(Json(json!({ "rows_affected": affected })))
}

pub async fn update_table(
    State(state): State<AppState>,
    Path(target): Path<TableRef>,
    Query(filters): Query<Filters>,
    Json(changes): Json<Value>,
) -> JsonResult {
    let affected = state.adapter.update(&target, &filters, changes).await?;
    Ok(Json(json!({ "rows_affected": affected })))
}
