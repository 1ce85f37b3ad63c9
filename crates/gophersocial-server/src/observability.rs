//! Tracing setup.
//!
//! `RUST_LOG` wins when set. Otherwise the filter is built from the configured
//! level and applies to the GopherSocial crates and the HTTP access log; other
//! crates stay at `warn`. The level can be swapped at runtime through the
//! reload handle.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

const OWN_TARGETS: [&str; 4] = [
    "gophersocial_server",
    "gophersocial_auth",
    "gophersocial_storage",
    "tower_http",
];

/// Builds the filter directive string for `level`.
fn directives(level: &str) -> String {
    std::iter::once("warn".to_string())
        .chain(OWN_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn filter_for(level: &str) -> EnvFilter {
    std::env::var_os("RUST_LOG")
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .or_else(|| EnvFilter::try_new(directives(level)).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global subscriber at `info`. Later calls are no-ops.
pub fn init_tracing() {
    let (reload_layer, handle) = reload::Layer::new(filter_for("info"));
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switches the active filter to the configured `level`.
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let filter = filter_for(level);
        if let Err(e) = handle.modify(|f| *f = filter) {
            tracing::warn!(error = %e, "failed to apply logging level");
        }
    }
}
