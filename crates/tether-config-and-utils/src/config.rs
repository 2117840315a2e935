//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default page size for paginated live queries.
pub const DEFAULT_INITIAL_NUM_ITEMS: u32 = 20;

const ENV_LOG_LEVEL: &str = "TETHER_LOG_LEVEL";
const ENV_SITE_URL: &str = "TETHER_SITE_URL";
const ENV_SITE_URL_FALLBACK: &str = "CONVEX_SITE_URL";
const ENV_ENVIRONMENT: &str = "TETHER_ENV";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Identity provider site URL. Empty disables render-time session fetches.
    #[serde(default)]
    pub site_url: String,
    /// Default page size for paginated live queries.
    #[serde(default = "default_initial_num_items")]
    pub initial_num_items: u32,
    /// Production deployment (marks the session cookie Secure).
    #[serde(default)]
    pub production: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_initial_num_items() -> u32 {
    DEFAULT_INITIAL_NUM_ITEMS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            site_url: String::new(),
            initial_num_items: DEFAULT_INITIAL_NUM_ITEMS,
            production: false,
        }
    }
}

impl Config {
    /// Load configuration from the config file if present, then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(url) = non_empty(ENV_SITE_URL).or_else(|| non_empty(ENV_SITE_URL_FALLBACK)) {
            self.site_url = url;
        }
        if let Some(env) = non_empty(ENV_ENVIRONMENT) {
            self.production = matches!(
                env.to_ascii_lowercase().as_str(),
                "prod" | "production"
            );
        }
    }

    /// True when an identity provider URL is configured.
    pub fn has_site_url(&self) -> bool {
        !self.site_url.trim().is_empty()
    }

    /// Get the identity provider URL as a parsed URL.
    pub fn site_url(&self) -> CoreResult<Url> {
        if !self.has_site_url() {
            return Err(CoreError::Config("site_url is not set".to_string()));
        }
        Url::parse(&self.site_url).map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.initial_num_items, DEFAULT_INITIAL_NUM_ITEMS);
        assert!(!config.has_site_url());
        assert!(!config.production);
    }

    #[test]
    fn test_config_load_from_file_partial() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "site_url": "https://site.example" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.site_url, "https://site.example");
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_config_load_reads_base_dir_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(
            paths.config_file(),
            r#"{ "log_level": "debug", "initial_num_items": 50, "production": true }"#,
        )
        .unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(
            loaded,
            Config {
                log_level: "debug".to_string(),
                initial_num_items: 50,
                production: true,
                ..Config::default()
            }
        );
    }


    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("TETHER_LOG_LEVEL", "trace"),
            ("TETHER_SITE_URL", "https://a.example"),
            ("CONVEX_SITE_URL", "https://b.example"),
            ("TETHER_ENV", "Production"),
        ]));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.site_url, "https://a.example");
        assert!(config.production);
    }

    #[test]
    fn test_site_url_fallback_and_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("TETHER_SITE_URL", "  "),
            ("CONVEX_SITE_URL", "https://b.example"),
            ("TETHER_LOG_LEVEL", ""),
        ]));

        assert_eq!(config.site_url, "https://b.example");
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_site_url_parse() {
        let mut config = Config::default();
        assert!(matches!(config.site_url(), Err(CoreError::Config(_))));

        config.site_url = "not a valid url".to_string();
        assert!(matches!(config.site_url(), Err(CoreError::InvalidUrl(_))));

        config.site_url = "https://site.example".to_string();
        assert_eq!(config.site_url().unwrap().scheme(), "https");
    }
}
