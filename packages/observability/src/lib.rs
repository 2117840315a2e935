//! # Observability
//!
//! Centralized logging layer for Tether services.
//!
//! ## Design Philosophy
//!
//! Services are **log producers**. They call `observability::init()` once at
//! startup and use standard `tracing` macros everywhere else. They do not know
//! where logs go or who reads them.
//!
//! All services write structured JSONL to a single central file:
//! `~/.tether/logs/dev.jsonl`
//!
//! The client handles bearer tokens and forwarded cookies, so every entry is
//! passed through [`redact`] before it is written. Fields whose names mention a
//! credential are replaced with `[REDACTED]` and token-shaped values are
//! replaced regardless of their field name.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init("tether");
//!     tracing::info!("client started");
//! }
//! ```

mod json_layer;
pub mod redact;
mod writer;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};
pub use writer::{CentralLogWriter, WriterFactory};

/// Runtime redaction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservabilityMode {
    /// Development: keep fields and messages after credential redaction.
    #[default]
    DevVerbose,
    /// Production: keep only allow-listed metadata fields.
    ProdMetadataOnly,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "tether", "tether-cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.tether/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,

    /// Runtime redaction policy.
    pub mode: ObservabilityMode,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            mode: ObservabilityMode::DevVerbose,
        }
    }
}

/// Central log file location.
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".tether")
        .join("logs")
        .join("dev.jsonl")
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
/// If the log file cannot be opened, logging falls back to stderr only.
/// Calling this more than once is harmless; only the first call installs a
/// subscriber.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let (json_layer, open_error) = match CentralLogWriter::new(&log_path) {
        Ok(writer) => (
            Some(
                JsonLayer::new(
                    config.service_name.clone(),
                    WriterFactory::new(writer),
                    config.mode,
                )
                .with_filter(env_filter()),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    let stderr_layer = (config.also_stderr || open_error.is_some()).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter())
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match open_error {
        None => tracing::info!(
            log_path = %log_path.display(),
            service = %config.service_name,
            "observability initialized"
        ),
        Some(e) => tracing::warn!(
            log_path = %log_path.display(),
            error = %e,
            "failed to open log file, logging to stderr only"
        ),
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
        assert_eq!(config.mode, ObservabilityMode::DevVerbose);
    }

    #[test]
    fn test_default_log_path_layout() {
        let path = default_log_path();
        assert!(path.ends_with(".tether/logs/dev.jsonl"));
    }
}
