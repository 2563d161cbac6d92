//! Console logging setup.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `level` (an `EnvFilter` directive
/// string such as `info` or `tunetrain=debug,score=trace`).
///
/// An unparseable directive falls back to `info`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("Invalid log level {:?} ({}), using info", level, e);
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
