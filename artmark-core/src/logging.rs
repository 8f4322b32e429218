use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` directives are honoured. Without them the default level is
/// `info`, or `debug` when `ARTMARK_DEBUG` contains `1`. Calling this more
/// than once is harmless; only the first subscriber is kept.
pub fn initialize_logging() {
    let is_debug = std::env::var("ARTMARK_DEBUG")
        .unwrap_or_default()
        .contains('1');

    let filter = EnvFilter::builder()
        .with_default_directive(if is_debug {
            LevelFilter::DEBUG.into()
        } else {
            LevelFilter::INFO.into()
        })
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
