//! # Observability
//!
//! Tracing initialisation shared by every best-efforts delivery binary.
//!
//! Services call [`init`] or [`init_with_config`] once at startup and then use
//! the standard `tracing` macros. Log lines are written as JSONL to
//! `~/.bed/logs/bed.jsonl` (or a configured path), optionally mirrored to
//! stderr in a compact human format.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "bed".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file_writer;
mod json_layer;

use std::path::PathBuf;

pub use file_writer::{CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "bed", "reconciler").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.bed/logs/bed.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize the observability layer with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// Falls back to stderr-only logging when the log file cannot be opened.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let log_path = config.log_path.clone().or_else(default_log_path);

    let file_writer = log_path
        .as_ref()
        .and_then(|path| match CentralLogWriter::new(path) {
            Ok(writer) => Some(writer),
            Err(err) => {
                eprintln!("failed to open log file {}: {}", path.display(), err);
                None
            }
        });
    let file_enabled = file_writer.is_some();

    let json_layer = file_writer.map(|writer| {
        JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer)).with_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.default_level)),
        )
    });

    let stderr_layer = (config.also_stderr || !file_enabled).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(&config.default_level)),
            )
    });

    // A second init (tests, embedded use) keeps the first subscriber.
    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed && file_enabled {
        if let Some(path) = log_path {
            tracing::debug!(log_path = %path.display(), "observability initialized");
        }
    }
}

/// Central log file location, `~/.bed/logs/bed.jsonl`.
fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bed").join("logs").join("bed.jsonl"))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
