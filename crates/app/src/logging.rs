//! Tracing setup for the command-line binary.
//!
//! Logs go to stderr so command output on stdout stays clean.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

/// Initialize tracing based on the environment.
///
/// Development prints human-readable logs at `debug` for the workspace crates;
/// production emits flattened JSON at `info`. `RUST_LOG` overrides either default.
pub fn init_tracing(env: Environment) {
    if env.is_development() {
        init_development_tracing();
    } else {
        init_production_tracing();
    }
}

fn init_development_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,app=debug,services=debug,storage=debug"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .with_filter(env_filter),
        )
        .init();
}

fn init_production_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .flatten_event(true)
                .with_target(true)
                .with_filter(env_filter),
        )
        .init();
}
