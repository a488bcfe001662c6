//! Logging setup.
//!
//! All diagnostics go to stderr so stdout stays machine-readable. The
//! `MUSTER_LOG` environment variable takes standard tracing filter
//! directives; without it, each binary passes its own default.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter directives environment variable.
pub const LOG_ENV: &str = "MUSTER_LOG";

/// Install the global subscriber. Call once, at process start.
pub fn init(default_directives: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
