//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with either human-readable or JSON output.
//! Request spans come from `tower-http`'s trace layer, so the default filter
//! keeps `tower_http` at the same level as the gateway itself.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive for a level name.
fn default_directive(level: &str) -> String {
    format!("{level},tower_http={level},hyper=warn,reqwest=warn")
}

/// Initialize the logging subsystem.
///
/// `RUST_LOG` wins over `level` when set. Output goes to stderr.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    if json_format {
        // One object per line for log shippers
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Resolve the effective level and format from config plus CLI overrides.
pub fn resolve(
    config: &chexgate_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) -> (String, bool) {
    let level = if verbose_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let json_format = json_logs_override || config.logging.format == "json";
    (level, json_format)
}

/// Initialize logging from the loaded config.
pub fn init_from_config(
    config: &chexgate_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (level, json_format) = resolve(config, verbose_override, json_logs_override);
    init(&level, json_format);
}
