//! Tracing subscriber setup for binaries and integration harnesses
//! embedding this crate.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging. `RUST_LOG` wins; the fallback keeps this crate at
/// debug. Calling it twice panics, so it belongs in `main`.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
