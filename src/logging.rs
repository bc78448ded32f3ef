use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Install the global subscriber. Filter from `RUST_LOG` (default `info`);
/// `LOG_FORMAT=json` switches to one JSON object per event.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_current_span(false)).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
