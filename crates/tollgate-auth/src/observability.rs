//! Tracing setup for binaries and tests embedding the grant engine.
//!
//! The engine itself only emits `tracing` events. These helpers install a
//! subscriber whose level filter can be swapped at runtime.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Installs the subscriber at `info`, or `RUST_LOG` when set.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the subscriber with `level` as the fallback filter.
///
/// `RUST_LOG` takes precedence when it parses. Calling this more than once,
/// or after another global subscriber was set, leaves the first one in place.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();

    if installed {
        let _ = FILTER_HANDLE.set(handle);
        tracing::debug!(level, "Tracing initialized");
    }
}

/// Replaces the active level filter.
///
/// Returns `false` if no reloadable subscriber was installed by this module
/// or the filter could not be swapped.
pub fn apply_logging_level(level: &str) -> bool {
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };

    handle
        .modify(|filter| *filter = EnvFilter::new(level))
        .is_ok()
}
