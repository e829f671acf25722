//! Tracing setup for host processes.
//!
//! The crate itself only emits `tracing` events; the process that embeds it
//! (the frontend launcher) calls `init_tracing` once at startup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `directives` (typically
/// `AppConfig::log_level`) is used. Calling this twice is a no-op, which
/// keeps it safe under test harnesses.
pub fn init_tracing(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing("info");
        init_tracing("debug");
    }
}
