//! Configuration loading and data-directory resolution
//!
//! Resolution priority order:
//! 1. Environment variable (`PF_*`, highest priority)
//! 2. TOML config file
//! 3. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file location
pub const CONFIG_PATH_ENV: &str = "PF_CONFIG";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PF_DATA_DIR";

/// Top-level TOML configuration for the pipeline service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Directory holding the SQLite database
    pub data_dir: Option<PathBuf>,
    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used to build provider webhook callbacks
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Work-queue tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
    /// Rate limit: jobs processed per rolling 60-second window
    #[serde(default = "default_jobs_per_minute")]
    pub jobs_per_minute: u32,
    /// Transient-failure re-queue cap before a task is marked failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Per-provider endpoint and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Provider endpoints for the three adapters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProvidersConfig {
    /// Phone/email data-lake finder
    #[serde(default)]
    pub data_lake: ProviderConfig,
    /// Primary (async-capable, domain-based) email finder
    #[serde(default)]
    pub domain_email: ProviderConfig,
    /// Secondary (LinkedIn-based) email finder
    #[serde(default)]
    pub profile_email: ProviderConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5810
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:5810".to_string()
}

fn default_jobs_per_minute() -> u32 {
    60
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            queue: QueueConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            jobs_per_minute: default_jobs_per_minute(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_config() -> Result<TomlConfig> {
    match find_config_file() {
        Some(path) => read_toml_config(&path),
        None => Ok(TomlConfig::default()),
    }
}

/// Locate the config file: `PF_CONFIG` env var, then the platform config dir
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    let candidate = dirs::config_dir().map(|d| d.join("peoplefinder").join("config.toml"))?;
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write a TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the data directory for the service
///
/// Priority: `PF_DATA_DIR` env var, then the config file's `data_dir`,
/// then an OS-dependent default.
pub fn resolve_data_dir(config: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    if let Some(ref dir) = config.data_dir {
        return dir.clone();
    }

    default_data_dir()
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("peoplefinder"))
        .unwrap_or_else(|| PathBuf::from("./peoplefinder_data"))
}

/// Database file path inside a data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("peoplefinder.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sane() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5810);
        assert_eq!(config.queue.jobs_per_minute, 60);
        assert_eq!(config.queue.max_attempts, 5);
        assert!(config.providers.data_lake.base_url.is_none());
    }

    #[test]
    fn toml_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = TomlConfig::default();
        config.port = 6001;
        config.providers.domain_email.api_key = Some("k-123".to_string());

        write_toml_config(&config, &path).unwrap();
        let loaded = read_toml_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "port = 7000\n").unwrap();

        let loaded = read_toml_config(&path).unwrap();
        assert_eq!(loaded.port, 7000);
        assert_eq!(loaded.host, "127.0.0.1");
        assert_eq!(loaded.queue.jobs_per_minute, 60);
    }

    #[test]
    fn database_path_joins_data_dir() {
        let dir = PathBuf::from("/tmp/pf");
        assert_eq!(database_path(&dir), PathBuf::from("/tmp/pf/peoplefinder.db"));
    }
}
