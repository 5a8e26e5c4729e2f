// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`WatcherConfig`] is the file form, where every key is optional.
//! [`ResolvedConfig`] is what the watcher runs with after defaults and CLI
//! overrides are applied.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grouper::TailerConfig;
use crate::vhost::DEFAULT_VHOST_DIR;

/// Watcher configuration as written in `tracewatch.json` / `config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Log file to tail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Whether traces are delivered at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Webhook receiving the traces
    #[serde(alias = "n8n_url", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Directory of virtual-host configs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vhost_dir: Option<PathBuf>,

    /// Seconds between config file reloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_interval_secs: Option<u64>,

    /// Webhook request timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_timeout_ms: Option<u64>,

    /// Silence after which a trace is complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_period_ms: Option<u64>,

    /// End-of-file poll interval while idle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_poll_ms: Option<u64>,

    /// End-of-file poll interval while a trace is open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collect_poll_ms: Option<u64>,

    /// Resolver cache settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

/// Resolver cache settings (file form).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_capacity: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blame_capacity: Option<usize>,
}

/// Resolver cache settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCacheConfig {
    pub ttl_secs: u64,
    pub repo_capacity: usize,
    pub blame_capacity: usize,
}

impl ResolvedCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ResolvedCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            repo_capacity: 1000,
            blame_capacity: 5000,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub log_file: Option<PathBuf>,
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub vhost_dir: PathBuf,
    pub reload_interval_secs: u64,
    pub delivery_timeout_ms: u64,
    pub quiet_period_ms: u64,
    pub idle_poll_ms: u64,
    pub collect_poll_ms: u64,
    pub cache: ResolvedCacheConfig,
}

impl ResolvedConfig {
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            quiet_period: Duration::from_millis(self.quiet_period_ms),
            idle_poll: Duration::from_millis(self.idle_poll_ms),
            collect_poll: Duration::from_millis(self.collect_poll_ms),
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            enabled: false,
            webhook_url: None,
            vhost_dir: PathBuf::from(DEFAULT_VHOST_DIR),
            reload_interval_secs: 10,
            delivery_timeout_ms: 2000,
            quiet_period_ms: 2000,
            idle_poll_ms: 500,
            collect_poll_ms: 200,
            cache: ResolvedCacheConfig::default(),
        }
    }
}
