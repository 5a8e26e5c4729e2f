// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for tracewatch.
//!
//! Handles loading, merging, and validation of configuration from:
//! - An explicit `--config` path
//! - Working directory: tracewatch.json, tracewatch.yaml or config.json
//! - Global config: ~/.tracewatch/config.json
//! - CLI options: command-line arguments
//!
//! Only one file is used. CLI options override it, and defaults fill the rest.
//! [`ConfigReloader`] re-reads the file while the watcher runs.

mod loader;
mod merger;
mod reload;
mod types;

use std::path::{Path, PathBuf};

// Re-export public types
pub use loader::{
    find_config_file, get_example_config, get_global_config_dir, get_global_config_path,
    init_config, load_config_file, save_config_file, CONFIG_FILES, GLOBAL_CONFIG_DIR,
    GLOBAL_CONFIG_FILE,
};

pub use merger::{default_config, merge_config, validate_config, CliOptions};

pub use reload::ConfigReloader;

pub use types::{CacheConfig, ResolvedCacheConfig, ResolvedConfig, WatcherConfig};

use crate::error::ConfigError;

/// Pick the config file: `explicit` if given, otherwise the first one found.
pub fn resolve_config_path(explicit: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(working_dir),
    }
}

/// Load `path` (if any), merge CLI options over it and validate the result.
///
/// This is the main entry point for configuration loading.
pub fn load_config(path: Option<&Path>, cli: &CliOptions) -> Result<ResolvedConfig, ConfigError> {
    let file = path.map(load_config_file).transpose()?;
    let config = merge_config(file.as_ref(), cli);
    validate_config(&config)?;
    Ok(config)
}
