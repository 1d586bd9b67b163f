//! Application-level middleware applied to every route.
//!
//! Outermost first: trailing slash removal, request id assignment, request
//! tracing, request id propagation to the response, panic recovery.
//!
//! Trailing slashes are trimmed before routing, so `/db/schema/table/` is the
//! same route as `/db/schema/table`.

use axum::Router;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

pub fn apply(router: Router) -> Router {
    let app = router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::new()),
    );
    // A layer added with `Router::layer` runs after routing; wrap instead.
    Router::new().fallback_service(NormalizePathLayer::trim_trailing_slash().layer(app))
}
