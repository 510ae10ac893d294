//! Console logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr `fmt` subscriber. `RUST_LOG` overrides the base level.
pub fn setup_logging(debug: bool) {
    let base_level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(debug)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
    {
        eprintln!("logging already initialized: {e}");
    }
}
