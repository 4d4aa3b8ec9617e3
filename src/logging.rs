//! Structured logging setup
//!
//! The engine only emits `tracing` events; binaries and tests decide where they go.
//! `KESTREL_LOG` takes the usual filter directives (`debug`,
//! `kestrel::transaction=debug,warn`, ...) and wins over the level passed in.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber at `info` unless `KESTREL_LOG` says otherwise
pub fn init() {
    init_logging("info");
}

/// Install the global fmt subscriber. Later calls leave the first subscriber in place.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env("KESTREL_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .compact();

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init_logging("debug");
        tracing::info!("logging initialised twice");
    }
}
