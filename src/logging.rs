//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "bookshelf=debug,tower_http=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `LOG_FORMAT=pretty` switches from JSON lines to human-readable output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let pretty = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("pretty"))
        .unwrap_or(false);

    if pretty {
        registry.with(fmt::layer()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}
