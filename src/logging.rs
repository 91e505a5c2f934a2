//! logging
//!
//! Subscriber setup for the binary. The library only emits `tracing`
//! events inside the spans its components are given; it never installs a
//! subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
fn default_filter(debug: bool) -> &'static str {
    if debug {
        "gitops_guard=debug,kube=info,warn"
    } else {
        "gitops_guard=info,warn"
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default filter. Safe to call twice; the second
/// call is a no-op.
pub fn init(debug: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
