// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles loading configuration from JSON and YAML files in various locations.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{CacheConfig, WatcherConfig};

/// Config file names to search for in the working directory (in order).
pub const CONFIG_FILES: &[&str] = &["tracewatch.json", "tracewatch.yaml", "config.json"];

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".tracewatch";

/// Global config file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Get the global config file path.
pub fn get_global_config_path() -> Option<PathBuf> {
    get_global_config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
}

/// Find the config file to use.
///
/// Searches `working_dir` for each of [`CONFIG_FILES`], then falls back to
/// `~/.tracewatch/config.json`.
pub fn find_config_file(working_dir: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| working_dir.join(name))
        .chain(get_global_config_path())
        .find(|path| path.is_file())
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<WatcherConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

/// Save configuration to `path` as pretty JSON.
pub fn save_config_file(path: &Path, config: &WatcherConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Write an example config into `dir`, refusing to overwrite an existing one.
pub fn init_config(dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = dir.join(CONFIG_FILES[0]);
    if path.exists() {
        return Err(ConfigError::InvalidValue {
            field: "path".to_string(),
            message: format!("{} already exists", path.display()),
        });
    }
    save_config_file(&path, &get_example_config())?;
    Ok(path)
}

/// Get an example configuration.
pub fn get_example_config() -> WatcherConfig {
    WatcherConfig {
        log_file: Some(PathBuf::from("/var/log/apache2/error.log")),
        enabled: Some(true),
        webhook_url: Some("https://n8n.example.com/webhook/apache-error".to_string()),
        vhost_dir: Some(PathBuf::from("/etc/apache2/sites-enabled")),
        reload_interval_secs: Some(10),
        cache: Some(CacheConfig {
            ttl_secs: Some(86400),
            ..Default::default()
        }),
        ..Default::default()
    }
}
