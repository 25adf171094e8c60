use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so table and CSV output
/// on stdout stays clean. `RUST_LOG` overrides the level chosen by `verbose`.
pub fn init(verbose: bool) {
    let default = if verbose {
        "info,nfl_lines=debug"
    } else {
        "warn,nfl_lines=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
