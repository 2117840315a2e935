//! Logging initialization.
//!
//! Thin wrapper over the observability crate. Every Tether process writes
//! structured JSONL to `<base>/logs/dev.jsonl`; credential-bearing fields are
//! redacted before they reach the file.

use crate::{CoreResult, Paths};
use observability::{LogConfig, ObservabilityMode};

/// Initialize logging for the default `tether` service.
///
/// Log level comes from `RUST_LOG` when set, otherwise `level`.
///
/// ```ignore
/// init_logging(&Paths::new()?, "info")?;
/// tracing::info!("client started");
/// ```
pub fn init_logging(paths: &Paths, level: &str) -> CoreResult<()> {
    init_logging_for_service("tether", paths, level)
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, paths: &Paths, level: &str) -> CoreResult<()> {
    paths.ensure_dirs()?;

    let mode = match std::env::var("TETHER_OBS_MODE")
        .unwrap_or_else(|_| "dev".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "prod" | "production" => ObservabilityMode::ProdMetadataOnly,
        _ => ObservabilityMode::DevVerbose,
    };

    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level_directive(level),
        log_path: Some(paths.log_file()),
        also_stderr: true,
        mode,
    });
    Ok(())
}

/// Parse a log level string into a tracing Level.
///
/// Accepts the usual names in any case plus `warning`; anything else is INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => tracing::Level::WARN,
        other => other.parse().unwrap_or(tracing::Level::INFO),
    }
}

/// Filter directive for a configured level, e.g. `"Warning"` -> `"warn"`.
fn level_directive(level: &str) -> String {
    parse_level(level).as_str().to_ascii_lowercase()
}
