// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Precedence (highest to lowest): CLI options, config file, defaults.

use std::path::PathBuf;

use crate::error::ConfigError;

use super::types::{ResolvedConfig, WatcherConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub log_file: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub vhost_dir: Option<PathBuf>,
    pub enabled: Option<bool>,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge a config file and CLI options over the defaults.
pub fn merge_config(file: Option<&WatcherConfig>, cli: &CliOptions) -> ResolvedConfig {
    let mut result = default_config();

    if let Some(config) = file {
        apply_watcher_config(&mut result, config);
    }

    apply_cli_options(&mut result, cli);

    result
}

fn apply_watcher_config(result: &mut ResolvedConfig, config: &WatcherConfig) {
    if config.log_file.is_some() {
        result.log_file = config.log_file.clone();
    }

    if let Some(enabled) = config.enabled {
        result.enabled = enabled;
    }

    if config.webhook_url.is_some() {
        result.webhook_url = config.webhook_url.clone();
    }

    if let Some(ref dir) = config.vhost_dir {
        result.vhost_dir = dir.clone();
    }

    if let Some(secs) = config.reload_interval_secs {
        result.reload_interval_secs = secs;
    }

    if let Some(ms) = config.delivery_timeout_ms {
        result.delivery_timeout_ms = ms;
    }

    if let Some(ms) = config.quiet_period_ms {
        result.quiet_period_ms = ms;
    }

    if let Some(ms) = config.idle_poll_ms {
        result.idle_poll_ms = ms;
    }

    if let Some(ms) = config.collect_poll_ms {
        result.collect_poll_ms = ms;
    }

    if let Some(ref cache) = config.cache {
        if let Some(ttl) = cache.ttl_secs {
            result.cache.ttl_secs = ttl;
        }
        if let Some(capacity) = cache.repo_capacity {
            result.cache.repo_capacity = capacity;
        }
        if let Some(capacity) = cache.blame_capacity {
            result.cache.blame_capacity = capacity;
        }
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if cli.log_file.is_some() {
        result.log_file = cli.log_file.clone();
    }

    if cli.webhook_url.is_some() {
        result.webhook_url = cli.webhook_url.clone();
    }

    if let Some(ref dir) = cli.vhost_dir {
        result.vhost_dir = dir.clone();
    }

    if let Some(enabled) = cli.enabled {
        result.enabled = enabled;
    }
}

/// Reject values the watcher cannot run with.
pub fn validate_config(config: &ResolvedConfig) -> Result<(), ConfigError> {
    let non_zero = [
        ("delivery_timeout_ms", config.delivery_timeout_ms),
        ("quiet_period_ms", config.quiet_period_ms),
        ("idle_poll_ms", config.idle_poll_ms),
        ("collect_poll_ms", config.collect_poll_ms),
        ("cache.repo_capacity", config.cache.repo_capacity as u64),
        ("cache.blame_capacity", config.cache.blame_capacity as u64),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
    }

    if let Some(ref url) = config.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "webhook_url".to_string(),
                message: format!("expected an http(s) URL, got {url:?}"),
            });
        }
    }

    Ok(())
}
