//! Tracing initialization for binary consumers.
//!
//! The library itself never installs a global subscriber — only
//! applications linking `sentinel-core` should call [`init_tracing`],
//! typically once at process startup.

use tracing_subscriber::{EnvFilter, fmt};

/// Install a default `tracing-subscriber` formatter driven by the
/// `RUST_LOG` environment variable (falls back to `info` when unset).
///
/// # Panics
///
/// Panics if a global subscriber has already been installed — call this
/// at most once per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(true)
        .init();
}

#[cfg(test)]
mod tests {
    // `init_tracing` installs a process-global subscriber, so it is not
    // exercised here to avoid interfering with other tests in the same
    // binary; its correctness is structural (delegates to tracing-subscriber).
}
