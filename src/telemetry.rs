use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Filter directive: `PUNGI_LOG`, then `RUST_LOG`, then `info` with --verbose or `warn`.
fn filter_directive(verbose: bool) -> String {
    ["PUNGI_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|k| env::var(k).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| if verbose { "info" } else { "warn" }.to_string())
}

/// Install the global stderr subscriber once; later calls are no-ops.
///
/// Returns false when another subscriber was already installed.
pub fn telemetry_init(verbose: bool) -> bool {
    if INIT.get().is_some() {
        return true;
    }

    let directive = filter_directive(verbose);
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("pungi: ignoring invalid log filter '{directive}': {e}");
        EnvFilter::new("warn")
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr));

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("pungi: logging init skipped (global subscriber already set)");
        return false;
    }

    let _ = INIT.set(());
    true
}
