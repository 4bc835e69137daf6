//! Configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default destination directory.
    pub dest: Option<PathBuf>,
    /// Number of root tasks downloaded at once.
    pub concurrency: usize,
    /// Payloads above this size (bytes) get their own progress bar.
    pub progress_threshold: u64,
    /// Path templates.
    pub naming: NamingConfig,
}

/// Per-type path templates.
///
/// `{Field}` placeholders are bound to item fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub movie: String,
    pub series: String,
    pub season: String,
    pub collection: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dest: None,
            concurrency: 1,
            progress_threshold: 1024 * 1024,
            naming: NamingConfig::default(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            movie: "{Name} ({ProductionYear})".to_string(),
            series: "{Name} ({ProductionYear})".to_string(),
            season: "{Name}".to_string(),
            collection: "{Name}".to_string(),
        }
    }
}

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jellyfetch")
}

/// Load configuration from file.
pub fn load_config() -> Config {
    let config_path = config_dir().join("config.toml");

    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring invalid {:?}: {}", config_path, e),
            },
            Err(e) => tracing::warn!("Cannot read {:?}: {}", config_path, e),
        }
    }

    Config::default()
}
