//! Access Control Middleware.
//! Authorizes table-level requests before they reach a CRUD handler.
//!
//! The layer is installed with `route_layer` on the CRUD routes, so it reads
//! the same decoded path parameters as the handlers.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{FromRequestParts, RawPathParams},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tower::{Layer, Service};

use crate::config::AccessConfig;

/// Kind of access a request needs on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    /// Permission required by an HTTP method, `None` for methods no CRUD route accepts.
    pub fn for_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Permission::Read),
            Method::POST | Method::PUT | Method::PATCH => Some(Permission::Write),
            Method::DELETE => Some(Permission::Delete),
            _ => None,
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "delete" => Ok(Permission::Delete),
            other => Err(format!("unknown permission {other:?}")),
        }
    }
}

/// The table a request targets, taken from the matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAccess {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub method: Method,
    /// Set for `/batch/{database}/{schema}/{table}`.
    pub batch: bool,
}

impl TableAccess {
    /// Build from the decoded path parameters of a matched table route.
    ///
    /// These are the same values the handler's `Path` extractor sees. `path`
    /// is the routed request path and only decides the batch flag.
    pub fn from_params<'a, I>(method: &Method, path: &str, params: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let (mut database, mut schema, mut table) = (None, None, None);
        for (key, value) in params {
            match key {
                "database" => database = Some(value),
                "schema" => schema = Some(value),
                "table" => table = Some(value),
                _ => {}
            }
        }

        Some(Self {
            database: database?.to_string(),
            schema: schema?.to_string(),
            table: table?.to_string(),
            method: method.clone(),
            batch: path.trim_matches('/').split('/').count() == 4,
        })
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required authorization to table {table}")]
pub struct Denied {
    pub table: String,
}

/// Decides whether a table-level request may proceed.
pub trait Authorizer: Send + Sync + 'static {
    fn authorize(&self, access: &TableAccess) -> Result<(), Denied>;
}

/// Table permission policy read from `[access]`.
///
/// Unrestricted policies allow everything; restricted ones allow only the
/// listed tables with the permission the method implies.
#[derive(Debug, Clone, Default)]
pub struct TablePolicy {
    restrict: bool,
    tables: HashMap<String, HashSet<Permission>>,
}

impl TablePolicy {
    pub fn from_config(config: &AccessConfig) -> Self {
        let tables = config
            .tables
            .iter()
            .map(|t| {
                let permissions = t
                    .permissions
                    .iter()
                    .filter_map(|p| p.parse().ok())
                    .collect();
                (t.name.clone(), permissions)
            })
            .collect();

        Self {
            restrict: config.restrict,
            tables,
        }
    }
}

impl Authorizer for TablePolicy {
    fn authorize(&self, access: &TableAccess) -> Result<(), Denied> {
        if !self.restrict {
            return Ok(());
        }

        let allowed = Permission::for_method(&access.method).is_some_and(|needed| {
            self.tables
                .get(&access.table)
                .is_some_and(|granted| granted.contains(&needed))
        });

        if allowed {
            Ok(())
        } else {
            Err(Denied {
                table: access.table.clone(),
            })
        }
    }
}

/// Tower layer that runs an [`Authorizer`] in front of the wrapped service.
#[derive(Clone)]
pub struct AccessControlLayer {
    authorizer: Arc<dyn Authorizer>,
}

impl AccessControlLayer {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

impl<S> Layer<S> for AccessControlLayer {
    type Service = AccessControlService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessControlService {
            inner,
            authorizer: self.authorizer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AccessControlService<S> {
    inner: S,
    authorizer: Arc<dyn Authorizer>,
}

impl<S> Service<Request<Body>> for AccessControlService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authorizer = self.authorizer.clone();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            // Undecodable parameters are rejected here, before any handler.
            let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
                Ok(params) => params,
                Err(rejection) => return Ok(rejection.into_response()),
            };

            if let Some(access) = TableAccess::from_params(&parts.method, parts.uri.path(), params.iter()) {
                if let Err(denied) = authorizer.authorize(&access) {
                    tracing::debug!(table = %denied.table, "Access denied");
                    return Ok(denied_response(&denied));
                }
            }
            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

fn denied_response(denied: &Denied) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "required authorization to table", "table": denied.table })),
    )
        .into_response()
}
