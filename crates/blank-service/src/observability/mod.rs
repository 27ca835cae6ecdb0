//! Logging setup.
//!
//! `RUST_LOG` takes precedence. Without it the service logs at `info`, or at
//! `debug` when started with `--verbose`. The `blank` directive covers the
//! `blank_service` crate and the `blank.*` event targets.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "blank=debug,common=debug,tower_http=debug"
    } else {
        "blank=info,common=info,tower_http=info"
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(verbose: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        assert!(default_filter(false).starts_with("blank=info"));
        assert!(default_filter(true).starts_with("blank=debug"));
    }

    #[test]
    fn test_default_filters_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
    }
}
