// ABOUTME: Tracing setup for the clawlog binary.
// ABOUTME: Compact stderr output filtered by CLAWLOG_LOG, then RUST_LOG, then a default level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "CLAWLOG_LOG";

/// Install the global tracing subscriber. `verbose` raises the default
/// level to debug when no filter is set in the environment.
pub fn init_logging(verbose: bool) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(build_env_filter(verbose))
        .with(fmt_layer)
        .init();
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    let directive = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|value| !value.trim().is_empty());

    match directive {
        Some(directive) => EnvFilter::new(directive),
        None if verbose => EnvFilter::new("debug"),
        None => EnvFilter::new("warn"),
    }
}
