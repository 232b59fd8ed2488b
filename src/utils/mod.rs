//! Shared utilities: label tables, blocking I/O and logging setup.

pub mod blocking;
pub mod dict;

pub use dict::LabelTable;

/// Initializes the tracing subscriber for diagnostics.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_directive` (for
/// example `"warn"` or `"oar_classify=debug"`) is used. Calling this more than
/// once keeps the first subscriber.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
