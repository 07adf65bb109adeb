//! Shared plumbing for the `combifold` command-line binary: the file
//! formats of spec.md §6 and the logging setup, split out of `main.rs`
//! the same way `coupe-tools` keeps its format/helper code alongside its
//! binaries rather than inline in `main`.

pub mod io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the default `tracing` subscriber: an `EnvFilter` (respecting
/// `RUST_LOG`, defaulting to `info`) plus a plain `fmt` layer, and,
/// optionally, a Chrome trace-event layer for flamegraph profiling
/// (SPEC_FULL.md "[AMBIENT] Logging").
///
/// Returns the `tracing-chrome` flush guard; the caller must keep it
/// alive for the duration of the run, dropping it only once every span
/// has closed.
pub fn init_logging(chrome_trace: Option<&str>) -> Option<tracing_chrome::FlushGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    match chrome_trace {
        Some(path) => {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file(path).build();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(chrome_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
            None
        }
    }
}
