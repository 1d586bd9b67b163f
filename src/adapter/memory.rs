//! In-memory adapter.
//!
//! Keeps databases → schemas → tables → JSON rows in process memory. Tables
//! are created on first insert. Query-string pairs filter rows by equality;
//! `_page`, `_page_size` and `_select` shape `select` results and every other
//! `_`-prefixed key is ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::{json, Map, Value};

use super::{Adapter, AdapterError, Filters, TableRef};

type Row = Map<String, Value>;
type Tables = BTreeMap<String, Vec<Row>>;
type Schemas = BTreeMap<String, Tables>;

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    databases: RwLock<BTreeMap<String, Schemas>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table so discovery lists it before any insert.
    pub fn with_table(self, database: &str, schema: &str, table: &str) -> Self {
        if let Ok(mut dbs) = self.databases.write() {
            dbs.entry(database.to_string())
                .or_default()
                .entry(schema.to_string())
                .or_default()
                .entry(table.to_string())
                .or_default();
        }
        self
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Schemas>>, AdapterError> {
        self.databases
            .read()
            .map_err(|_| AdapterError::Internal("memory store poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Schemas>>, AdapterError> {
        self.databases
            .write()
            .map_err(|_| AdapterError::Internal("memory store poisoned".into()))
    }
}

fn object(value: Value) -> Result<Row, AdapterError> {
    match value {
        Value::Object(row) => Ok(row),
        other => Err(AdapterError::BadRequest(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn matches(row: &Row, filters: &Filters) -> bool {
    filters
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .all(|(key, expected)| match row.get(key) {
            Some(Value::String(s)) => s == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        })
}

fn page_param(filters: &Filters, key: &str) -> Result<Option<usize>, AdapterError> {
    filters
        .get(key)
        .map(|v| {
            v.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AdapterError::BadRequest(format!("{key} must be a positive integer")))
        })
        .transpose()
}

fn table_mut<'a>(
    dbs: &'a mut BTreeMap<String, Schemas>,
    target: &TableRef,
) -> Result<&'a mut Vec<Row>, AdapterError> {
    dbs.get_mut(&target.database)
        .and_then(|schemas| schemas.get_mut(&target.schema))
        .and_then(|tables| tables.get_mut(&target.table))
        .ok_or_else(|| AdapterError::NotFound(format!("table {}", target.table)))
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn databases(&self) -> Result<Vec<Value>, AdapterError> {
        let dbs = self.read()?;
        Ok(dbs.keys().map(|name| json!({ "datname": name })).collect())
    }

    async fn schemas(&self) -> Result<Vec<Value>, AdapterError> {
        let dbs = self.read()?;
        let names: BTreeSet<&String> = dbs.values().flat_map(|schemas| schemas.keys()).collect();
        Ok(names.into_iter().map(|name| json!({ "schema_name": name })).collect())
    }

    async fn tables(&self) -> Result<Vec<Value>, AdapterError> {
        let dbs = self.read()?;
        let mut out = Vec::new();
        for (database, schemas) in dbs.iter() {
            for (schema, tables) in schemas {
                for name in tables.keys() {
                    out.push(json!({ "database": database, "schema": schema, "name": name }));
                }
            }
        }
        Ok(out)
    }

    async fn tables_by_database_and_schema(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<Value>, AdapterError> {
        let dbs = self.read()?;
        let tables = dbs
            .get(database)
            .and_then(|schemas| schemas.get(schema))
            .ok_or_else(|| AdapterError::NotFound(format!("schema {database}.{schema}")))?;
        Ok(tables.keys().map(|name| json!({ "name": name })).collect())
    }

    async fn select(&self, target: &TableRef, filters: &Filters) -> Result<Vec<Value>, AdapterError> {
        let page = page_param(filters, "_page")?;
        let page_size = page_param(filters, "_page_size")?;
        let columns: Option<Vec<&str>> = filters
            .get("_select")
            .map(|s| s.split(',').map(str::trim).filter(|c| !c.is_empty()).collect());

        let dbs = self.read()?;
        let rows = dbs
            .get(&target.database)
            .and_then(|schemas| schemas.get(&target.schema))
            .and_then(|tables| tables.get(&target.table))
            .ok_or_else(|| AdapterError::NotFound(format!("table {}", target.table)))?;

        let matching = rows.iter().filter(|row| matches(row, filters));
        let paged: Vec<&Row> = match (page, page_size) {
            (None, None) => matching.collect(),
            (page, size) => {
                let size = size.unwrap_or(10);
                let page = page.unwrap_or(1);
                matching.skip((page - 1) * size).take(size).collect()
            }
        };

        Ok(paged
            .into_iter()
            .map(|row| match &columns {
                Some(cols) => Value::Object(
                    row.iter()
                        .filter(|(k, _)| cols.contains(&k.as_str()))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
                None => Value::Object(row.clone()),
            })
            .collect())
    }

    async fn insert(&self, target: &TableRef, row: Value) -> Result<Value, AdapterError> {
        let row = object(row)?;
        let mut dbs = self.write()?;
        dbs.entry(target.database.clone())
            .or_default()
            .entry(target.schema.clone())
            .or_default()
            .entry(target.table.clone())
            .or_default()
            .push(row.clone());
        Ok(Value::Object(row))
    }

    async fn batch_insert(&self, target: &TableRef, rows: Vec<Value>) -> Result<Vec<Value>, AdapterError> {
        // Validate every row before touching the table so a bad batch inserts nothing.
        let rows = rows.into_iter().map(object).collect::<Result<Vec<_>, _>>()?;
        let mut dbs = self.write()?;
        dbs.entry(target.database.clone())
            .or_default()
            .entry(target.schema.clone())
            .or_default()
            .entry(target.table.clone())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.into_iter().map(Value::Object).collect())
    }

    async fn delete(&self, target: &TableRef, filters: &Filters) -> Result<u64, AdapterError> {
        let mut dbs = self.write()?;
        let rows = table_mut(&mut dbs, target)?;
        let before = rows.len();
        rows.retain(|row| !matches(row, filters));
        Ok((before - rows.len()) as u64)
    }

    async fn update(&self, target: &TableRef, filters: &Filters, changes: Value) -> Result<u64, AdapterError> {
        let changes = object(changes)?;
        let mut dbs = self.write()?;
        let rows = table_mut(&mut dbs, target)?;
        let mut updated = 0;
        for row in rows.iter_mut().filter(|row| matches(row, filters)) {
            for (key, value) in &changes {
                row.insert(key.clone(), value.clone());
            }
            updated += 1;
        }
        Ok(updated)
    }

    async fn execute_script(&self, _method: &Method, _sql: &str) -> Result<Value, AdapterError> {
        Err(AdapterError::Unsupported("script execution"))
    }
}
