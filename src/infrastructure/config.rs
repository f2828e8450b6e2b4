//! Application configuration
//!
//! Layered loading: serde defaults, then an optional TOML file in the
//! platform config directory, then `RELIST_`-prefixed environment
//! variables. The policy constants in `domain::constants` provide the
//! defaults; deployments override them here rather than editing code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::constants::{enrichment, limits};
use crate::infrastructure::http_client::HttpClientConfig;

const CONFIG_DIR_NAME: &str = "relist";
const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "RELIST";

/// Enrichment service connection and dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    pub base_url: String,
    pub batch_size: usize,
    pub call_timeout_ms: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8700/".to_string(),
            batch_size: enrichment::DEFAULT_BATCH_SIZE,
            call_timeout_ms: enrichment::DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

/// Listing store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingStoreSettings {
    pub base_url: String,
}

impl Default for ListingStoreSettings {
    fn default() -> Self {
        Self { base_url: "http://localhost:8701/".to_string() }
    }
}

/// Identifier intake caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    pub inline_bulk_max: usize,
    pub catalog_bulk_max: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            inline_bulk_max: limits::INLINE_BULK_MAX,
            catalog_bulk_max: limits::CATALOG_BULK_MAX,
        }
    }
}

/// Logging output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Env-filter directive, e.g. "info" or "relist=debug,warn"
    pub level: String,
    /// Write a daily-rolling log file alongside console output
    pub file_output: bool,
    /// Log directory; defaults to the config directory's `logs` subfolder
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), file_output: false, directory: None }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub enrichment: EnrichmentSettings,
    pub listing_store: ListingStoreSettings,
    pub limits: LimitSettings,
    pub http: HttpClientConfig,
    pub logging: LoggingSettings,
}

/// Loads and resolves the layered configuration
pub struct ConfigManager;

impl ConfigManager {
    /// Platform config directory for this application
    pub fn config_dir() -> Result<PathBuf> {
        let base = dirs::config_dir().context("no platform config directory available")?;
        Ok(base.join(CONFIG_DIR_NAME))
    }

    /// Load configuration: defaults <- optional file <- environment
    pub fn load() -> Result<AppConfig> {
        let file_path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&file_path)
    }

    /// Load with an explicit file path (the file may be absent)
    pub fn load_from(file_path: &std::path::Path) -> Result<AppConfig> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .context("failed to serialize default configuration")?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(file_path.to_path_buf()).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("failed to assemble configuration")?;

        settings
            .try_deserialize::<AppConfig>()
            .context("configuration did not match the expected schema")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_mirror_policy_constants() {
        let config = AppConfig::default();
        assert_eq!(config.enrichment.batch_size, 10);
        assert_eq!(config.limits.inline_bulk_max, 50);
        assert_eq!(config.limits.catalog_bulk_max, 80);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigManager::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.enrichment.batch_size, AppConfig::default().enrichment.batch_size);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[enrichment]\nbatch_size = 25\n\n[limits]\ninline_bulk_max = 30"
        )
        .unwrap();

        let config = ConfigManager::load_from(&path).unwrap();
        assert_eq!(config.enrichment.batch_size, 25);
        assert_eq!(config.limits.inline_bulk_max, 30);
        // untouched sections keep their defaults
        assert_eq!(config.limits.catalog_bulk_max, 80);
    }
}
