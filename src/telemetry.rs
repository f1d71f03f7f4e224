//! Telemetry helpers for hosts embedding `neuroviz-sync`.
//!
//! Tracing setup stays opt-in. Hosts either call `init_default_tracing` with
//! the filter from their `ClientConfig` or install their own subscriber.

/// Installs a compact `tracing` subscriber when the `telemetry` feature is enabled.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `false` when the
/// feature is disabled or the host already installed a global subscriber.
#[must_use]
pub fn init_default_tracing(default_filter: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = default_filter;
        false
    }
}
