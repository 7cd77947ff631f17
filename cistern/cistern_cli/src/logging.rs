//! Log output for the CLI.
//!
//! The pool logs through the `log` facade; those records are forwarded into
//! the `tracing` subscriber installed here and written to stderr.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a level name as accepted by `--log-level`.
pub fn parse_level(name: &str) -> Result<Level, String> {
    match name.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warning" | "warn" => Ok(Level::WARN),
        "error" | "err" => Ok(Level::ERROR),
        other => Err(format!("unknown log level '{}'", other)),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(level: Level) {
    let result = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(err) = result {
        eprintln!("logging already initialized: {}", err);
    }
}
