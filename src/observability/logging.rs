//! Structured logging.
//!
//! `RUST_LOG` takes precedence. Without it the level follows the `debug`
//! setting of the loaded configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "prest=info,tower_http=info";
const DEBUG_FILTER: &str = "prest=debug,tower_http=debug";

pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        DEBUG_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// keep the first subscriber.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
