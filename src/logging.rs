//! Tracing subscriber setup for applications and tests.
//!
//! The library itself only emits events; installing a subscriber is left to the
//! application. `init_tracing` is the stock setup. Statement traces are emitted
//! on the `sqlrecord::trace` target at debug level, so
//! `RUST_LOG=sqlrecord::trace=debug` shows them alone.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` when a subscriber
/// was already installed, which makes repeated calls harmless.
pub fn init_tracing(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(fmt::layer().json()).try_init().is_ok()
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()
            .is_ok()
    }
}
