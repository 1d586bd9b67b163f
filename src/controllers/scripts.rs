//! `/_QUERIES/{queriesLocation}/{script}` execution.
//!
//! The script file is `{queries.location}/{queriesLocation}/{script}.{suffix}.sql`
//! where the suffix follows the method: `read` for GET, `write` for POST,
//! `update` for PUT/PATCH, `delete` for DELETE. `{{.name}}` placeholders are
//! filled from the query string with single quotes doubled.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::AppState;
use crate::adapter::{AdapterError, Filters};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("method {0} cannot run scripts")]
    Method(Method),

    #[error("invalid script name {0:?}")]
    InvalidName(String),

    #[error("script {0} not found")]
    NotFound(String),

    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("template error: {0}")]
    Template(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl IntoResponse for ScriptError {
    fn into_response(self) -> Response {
        let status = match &self {
            ScriptError::Method(_) => StatusCode::METHOD_NOT_ALLOWED,
            ScriptError::InvalidName(_) | ScriptError::Template(_) => StatusCode::BAD_REQUEST,
            ScriptError::NotFound(_) => StatusCode::NOT_FOUND,
            ScriptError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScriptError::Adapter(e) => e.status(),
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn execute_from_scripts(
    State(state): State<AppState>,
    Path((location, script)): Path<(String, String)>,
    method: Method,
    Query(params): Query<Filters>,
) -> Result<Response, ScriptError> {
    let path = script_path(&state.config.queries.location, &location, &script, &method)?;
    let template = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScriptError::NotFound(format!("{location}/{script}")));
        }
        Err(e) => return Err(e.into()),
    };

    let sql = render(&template, &params)?;
    tracing::debug!(script = %path.display(), "Executing script");
    let result = state.adapter.execute_script(&method, &sql).await?;
    Ok(Json(result).into_response())
}

fn suffix(method: &Method) -> Option<&'static str> {
    match *method {
        Method::GET => Some("read"),
        Method::POST => Some("write"),
        Method::PUT | Method::PATCH => Some("update"),
        Method::DELETE => Some("delete"),
        _ => None,
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && !segment.contains("..")
        && !segment.contains(['/', '\\'])
}

/// Resolve the script file, refusing names that could escape `root`.
pub fn script_path(root: &FsPath, location: &str, script: &str, method: &Method) -> Result<PathBuf, ScriptError> {
    let suffix = suffix(method).ok_or_else(|| ScriptError::Method(method.clone()))?;
    for segment in [location, script] {
        if !valid_segment(segment) {
            return Err(ScriptError::InvalidName(segment.to_string()));
        }
    }
    Ok(root.join(location).join(format!("{script}.{suffix}.sql")))
}

/// Replace `{{.name}}` placeholders with quoted-safe parameter values.
pub fn render(template: &str, params: &Filters) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| ScriptError::Template("unclosed placeholder".into()))?;
        let expr = after[..end].trim();
        let name = expr
            .strip_prefix('.')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ScriptError::Template(format!("unsupported expression {expr:?}")))?;
        let value = params
            .get(name)
            .ok_or_else(|| ScriptError::Template(format!("missing parameter {name:?}")))?;
        out.push_str(&value.replace('\'', "''"));
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}
