//! Logging initialization.
//!
//! Wraps the observability crate so every `bed` process writes structured
//! JSONL to `~/.bed/logs/bed.jsonl`.

use crate::Paths;
use observability::LogConfig;

/// Initialize the logging system.
///
/// `level` is the default filter; `RUST_LOG` takes precedence when set.
/// With `also_stderr` the compact human format is mirrored to stderr.
pub fn init_logging(service_name: &str, level: &str, paths: &Paths, also_stderr: bool) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
