use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "sheetjson=info";

/// Filter for `--verbose`; the CLI binary's own target is `sheetjson` too.
const VERBOSE_DIRECTIVE: &str = "sheetjson=debug";

/// Initializes console logging on stderr, filtered by `RUST_LOG`.
///
/// stdout is left to command output so converted JSON can be piped.
pub fn init_logging(verbose: bool) {
    let filter = build_filter(verbose);

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second init (tests) is not an error worth failing on
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}

fn build_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_DIRECTIVE)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    }
}
