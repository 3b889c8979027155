use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "fintrack=info";

/// An explicit `filter` wins over `RUST_LOG`, which wins over the crate
/// default. Unparseable directives fall through to the next source.
fn build_filter(filter: Option<&str>) -> EnvFilter {
    filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global fmt subscriber once per process.
pub fn init_tracing(filter: Option<&str>) {
    TRACING_INIT.call_once(|| {
        fmt().with_env_filter(build_filter(filter)).with_target(false).init();
        tracing::debug!("tracing initialized");
    });
}
