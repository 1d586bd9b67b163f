//! Route table construction and compilation.
//!
//! # Responsibilities
//! - Describe every route as data (pattern, methods, endpoint, scope)
//! - Reject ambiguous (pattern, method) pairs before anything is served
//! - Compile the table into an axum `Router`
//!
//! # Design Decisions
//! - Public routes live on the outer router
//! - Protected routes form a sub-router mounted as the outer router's
//!   fallback: it is only consulted once every public route has failed to match
//! - Access control is a `route_layer` on that sub-router, so it only runs for
//!   a matched route and method and sees the decoded path parameters
//! - Routes sharing a pattern are merged into one method router, in table order

use std::sync::Arc;

use axum::{
    handler::Handler,
    http::Method,
    routing::{any, on, MethodFilter, MethodRouter},
    Router,
};
use thiserror::Error;

use crate::controllers::{self, AppState};
use crate::http::middleware;
use crate::security::{AccessControlLayer, Authorizer};

/// Errors raised while building or compiling a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route {method} {pattern} is registered twice")]
    Duplicate { pattern: String, method: String },

    #[error("route {pattern} accepts any method and cannot share its pattern")]
    Shadowed { pattern: String },

    #[error("route {pattern} has no methods")]
    NoMethods { pattern: String },

    #[error("method {method} cannot be routed")]
    UnsupportedMethod { method: String },

    #[error("context path {0:?} must start with '/'")]
    ContextPath(String),
}

/// Which methods a route answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Methods {
    Any,
    Only(Vec<Method>),
}

impl Methods {
    pub fn only(methods: &[Method]) -> Self {
        Methods::Only(methods.to_vec())
    }

    fn filter(&self) -> Result<Option<MethodFilter>, RouteError> {
        match self {
            Methods::Any => Ok(None),
            Methods::Only(methods) => {
                let mut filter: Option<MethodFilter> = None;
                for method in methods {
                    let next = MethodFilter::try_from(method.clone()).map_err(|_| {
                        RouteError::UnsupportedMethod {
                            method: method.to_string(),
                        }
                    })?;
                    filter = Some(filter.map_or(next, |f| f.or(next)));
                }
                Ok(filter)
            }
        }
    }
}

/// Controller a route dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Databases,
    Schemas,
    Tables,
    ExecuteScript,
    TablesByDatabaseAndSchema,
    Select,
    Insert,
    BatchInsert,
    Delete,
    Update,
}

/// Whether a route sits behind the access-control layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pattern: &'static str,
    pub methods: Methods,
    pub endpoint: Endpoint,
    pub scope: Scope,
}

/// Accumulates routes in precedence order.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
}

impl RouteTableBuilder {
    pub fn public(self, pattern: &'static str, methods: Methods, endpoint: Endpoint) -> Self {
        self.push(Scope::Public, pattern, methods, endpoint)
    }

    pub fn protected(self, pattern: &'static str, methods: Methods, endpoint: Endpoint) -> Self {
        self.push(Scope::Protected, pattern, methods, endpoint)
    }

    fn push(mut self, scope: Scope, pattern: &'static str, methods: Methods, endpoint: Endpoint) -> Self {
        self.routes.push(Route {
            pattern,
            methods,
            endpoint,
            scope,
        });
        self
    }

    /// Freeze the table, rejecting ambiguous routes.
    pub fn build(self) -> Result<RouteTable, RouteError> {
        for (i, route) in self.routes.iter().enumerate() {
            if matches!(&route.methods, Methods::Only(m) if m.is_empty()) {
                return Err(RouteError::NoMethods {
                    pattern: route.pattern.to_string(),
                });
            }
            route.methods.filter()?;

            for earlier in self.routes[..i].iter().filter(|r| r.pattern == route.pattern) {
                match (&earlier.methods, &route.methods) {
                    (Methods::Only(a), Methods::Only(b)) => {
                        let clash = b
                            .iter()
                            .find(|m| covers(a, m))
                            .or_else(|| a.iter().find(|m| covers(b, m)));
                        if let Some(method) = clash {
                            return Err(RouteError::Duplicate {
                                pattern: route.pattern.to_string(),
                                method: method.to_string(),
                            });
                        }
                        if earlier.scope != route.scope {
                            return Err(RouteError::Shadowed {
                                pattern: route.pattern.to_string(),
                            });
                        }
                    }
                    _ => {
                        return Err(RouteError::Shadowed {
                            pattern: route.pattern.to_string(),
                        })
                    }
                }
            }
        }

        Ok(RouteTable {
            routes: self.routes,
        })
    }
}

/// Immutable, ordered route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// The prest route table: discovery first, then the CRUD group.
    pub fn prest() -> Result<Self, RouteError> {
        use Endpoint::*;

        Self::builder()
            .public("/databases", Methods::only(&[Method::GET]), Databases)
            .public("/schemas", Methods::only(&[Method::GET]), Schemas)
            .public("/tables", Methods::only(&[Method::GET]), Tables)
            .public("/_QUERIES/{queriesLocation}/{script}", Methods::Any, ExecuteScript)
            .public("/{database}/{schema}", Methods::only(&[Method::GET]), TablesByDatabaseAndSchema)
            .protected("/{database}/{schema}/{table}", Methods::only(&[Method::GET]), Select)
            .protected("/{database}/{schema}/{table}", Methods::only(&[Method::POST]), Insert)
            .protected("/batch/{database}/{schema}/{table}", Methods::only(&[Method::POST]), BatchInsert)
            .protected("/{database}/{schema}/{table}", Methods::only(&[Method::DELETE]), Delete)
            .protected(
                "/{database}/{schema}/{table}",
                Methods::only(&[Method::PUT, Method::PATCH]),
                Update,
            )
            .build()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Compile into a router. Protected routes are wrapped by `access`.
    pub fn compile(&self, state: AppState, access: AccessControlLayer) -> Result<Router, RouteError> {
        let public = self.scoped(Scope::Public, Router::new())?;
        let protected = self.scoped(Scope::Protected, Router::new())?.route_layer(access);

        Ok(public
            .fallback_service(protected.with_state(state.clone()))
            .with_state(state))
    }

    fn scoped(&self, scope: Scope, mut router: Router<AppState>) -> Result<Router<AppState>, RouteError> {
        let mut patterns: Vec<&'static str> = Vec::new();
        for route in self.routes.iter().filter(|r| r.scope == scope) {
            if !patterns.contains(&route.pattern) {
                patterns.push(route.pattern);
            }
        }

        for pattern in patterns {
            let mut merged: Option<MethodRouter<AppState>> = None;
            for route in self.routes.iter().filter(|r| r.scope == scope && r.pattern == pattern) {
                let next = bind_endpoint(route.endpoint, route.methods.filter()?);
                merged = Some(match merged {
                    Some(existing) => existing.merge(next),
                    None => next,
                });
            }
            if let Some(method_router) = merged {
                router = router.route(pattern, method_router);
            }
        }

        Ok(router)
    }
}

/// GET routes answer HEAD as well.
fn covers(methods: &[Method], method: &Method) -> bool {
    methods.contains(method) || (*method == Method::HEAD && methods.contains(&Method::GET))
}

fn bind<H, T>(filter: Option<MethodFilter>, handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    match filter {
        Some(filter) => on(filter, handler),
        None => any(handler),
    }
}

fn bind_endpoint(endpoint: Endpoint, filter: Option<MethodFilter>) -> MethodRouter<AppState> {
    match endpoint {
        Endpoint::Databases => bind(filter, controllers::get_databases),
        Endpoint::Schemas => bind(filter, controllers::get_schemas),
        Endpoint::Tables => bind(filter, controllers::get_tables),
        Endpoint::ExecuteScript => bind(filter, controllers::execute_from_scripts),
        Endpoint::TablesByDatabaseAndSchema => {
            bind(filter, controllers::get_tables_by_database_and_schema)
        }
        Endpoint::Select => bind(filter, controllers::select_from_tables),
        Endpoint::Insert => bind(filter, controllers::insert_in_tables),
        Endpoint::BatchInsert => bind(filter, controllers::batch_insert_in_tables),
        Endpoint::Delete => bind(filter, controllers::delete_from_table),
        Endpoint::Update => bind(filter, controllers::update_table),
    }
}

/// Builds the complete request handler served on every listener.
pub struct RouteComposer {
    state: AppState,
    authorizer: Arc<dyn Authorizer>,
}

impl RouteComposer {
    pub fn new(state: AppState, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { state, authorizer }
    }

    /// Route table, application middleware, then the context-path mount.
    ///
    /// Calling it again yields an equivalent router.
    pub fn compose(&self) -> Result<Router, RouteError> {
        let routes = RouteTable::prest()?.compile(
            self.state.clone(),
            AccessControlLayer::new(self.authorizer.clone()),
        )?;
        let app = middleware::apply(routes);
        mount(&self.state.config.http.context_path, app)
    }
}

/// Serve `app` under `context_path`; `/` mounts it at the root.
pub fn mount(context_path: &str, app: Router) -> Result<Router, RouteError> {
    if !context_path.starts_with('/') {
        return Err(RouteError::ContextPath(context_path.to_string()));
    }
    let prefix = context_path.trim_end_matches('/');
    if prefix.is_empty() {
        Ok(app)
    } else {
        Ok(Router::new().nest_service(prefix, app))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prest_table_order() {
        let table = RouteTable::prest().unwrap();
        let summary: Vec<(&str, Endpoint, Scope)> = table
            .routes()
            .iter()
            .map(|r| (r.pattern, r.endpoint, r.scope))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("/databases", Endpoint::Databases, Scope::Public),
                ("/schemas", Endpoint::Schemas, Scope::Public),
                ("/tables", Endpoint::Tables, Scope::Public),
                ("/_QUERIES/{queriesLocation}/{script}", Endpoint::ExecuteScript, Scope::Public),
                ("/{database}/{schema}", Endpoint::TablesByDatabaseAndSchema, Scope::Public),
                ("/{database}/{schema}/{table}", Endpoint::Select, Scope::Protected),
                ("/{database}/{schema}/{table}", Endpoint::Insert, Scope::Protected),
                ("/batch/{database}/{schema}/{table}", Endpoint::BatchInsert, Scope::Protected),
                ("/{database}/{schema}/{table}", Endpoint::Delete, Scope::Protected),
                ("/{database}/{schema}/{table}", Endpoint::Update, Scope::Protected),
            ]
        );
    }

    #[test]
    fn rejects_duplicate_method_on_pattern() {
        let err = RouteTable::builder()
            .protected("/{a}/{b}/{c}", Methods::only(&[Method::PUT, Method::PATCH]), Endpoint::Update)
            .protected("/{a}/{b}/{c}", Methods::only(&[Method::PATCH]), Endpoint::Insert)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                pattern: "/{a}/{b}/{c}".into(),
                method: "PATCH".into()
            }
        );
    }

    #[test]
    fn get_route_claims_head() {
        let err = RouteTable::builder()
            .public("/tables", Methods::only(&[Method::HEAD]), Endpoint::Tables)
            .public("/tables", Methods::only(&[Method::GET]), Endpoint::Tables)
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
    }

    #[test]
    fn any_method_route_cannot_share_pattern() {
        let err = RouteTable::builder()
            .public("/_QUERIES/{l}/{s}", Methods::Any, Endpoint::ExecuteScript)
            .public("/_QUERIES/{l}/{s}", Methods::only(&[Method::GET]), Endpoint::Tables)
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::Shadowed { .. }));
    }

    #[test]
    fn pattern_cannot_straddle_scopes() {
        let err = RouteTable::builder()
            .public("/{a}/{b}", Methods::only(&[Method::GET]), Endpoint::TablesByDatabaseAndSchema)
            .protected("/{a}/{b}", Methods::only(&[Method::POST]), Endpoint::Insert)
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::Shadowed { .. }));
    }

    #[test]
    fn rejects_empty_method_list() {
        let err = RouteTable::builder()
            .public("/databases", Methods::Only(Vec::new()), Endpoint::Databases)
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::NoMethods { .. }));
    }

    #[test]
    fn mount_rejects_relative_context() {
        assert!(matches!(
            mount("api", Router::new()),
            Err(RouteError::ContextPath(_))
        ));
        assert!(mount("/", Router::new()).is_ok());
        assert!(mount("/api/", Router::new()).is_ok());
    }
}
