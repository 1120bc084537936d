//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `CATALOG_`, nested keys split on `__`,
//!    e.g. `CATALOG_QUERY__MAX_PAGE_SIZE=50`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/catalog-access/{service_name}/config.toml
//! 4. System directory: /etc/catalog-access/{service_name}/config.toml
//! 5. Default values

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const APP_PREFIX: &str = "catalog-access";
const ENV_PREFIX: &str = "CATALOG_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Paging limits applied to every search
    #[serde(default)]
    pub query: QueryConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, also selects the XDG and /etc config directories
    pub name: String,

    /// Log filter directive (trace, debug, info, warn, error, or an EnvFilter string)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Page size policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size used when a request does not name one
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Upper bound every requested page size is clamped to
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl QueryConfig {
    /// Page size to use for a request, clamped to `1..=max_page_size`
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_access::config::QueryConfig;
    ///
    /// let query = QueryConfig::default();
    /// assert_eq!(query.effective_page_size(None), 20);
    /// assert_eq!(query.effective_page_size(Some(500)), 100);
    /// ```
    #[must_use]
    pub fn effective_page_size(&self, requested: Option<u64>) -> u64 {
        let max = self.max_page_size.max(1);
        requested.unwrap_or(self.default_page_size).clamp(1, max)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

impl Config {
    /// Load configuration using the binary name as the service name
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Self::named(service_name)));

        // Lowest priority first so later merges override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file plus environment overrides
    ///
    /// Bypasses the XDG and /etc lookups. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject page limits that cannot produce a usable page
    pub fn validate(&self) -> Result<()> {
        let query = &self.query;
        if query.max_page_size == 0 {
            return Err(figment::Error::from("query.max_page_size must be at least 1".to_string()).into());
        }
        if query.default_page_size == 0 || query.default_page_size > query.max_page_size {
            return Err(figment::Error::from(format!(
                "query.default_page_size must be between 1 and {}",
                query.max_page_size
            ))
            .into());
        }
        Ok(())
    }

    /// Config file locations in priority order (highest first)
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX);
        if let Some(path) = xdg_dirs.find_config_file(Path::new(service_name).join("config.toml")) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(APP_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_PREFIX.to_string(),
                log_level: default_log_level(),
                environment: default_environment(),
            },
            query: QueryConfig::default(),
        }
    }
}
