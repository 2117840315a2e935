//! Configuration, error types, paths and logging setup shared by Tether crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_INITIAL_NUM_ITEMS, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::Paths;
