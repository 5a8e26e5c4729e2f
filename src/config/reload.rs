// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Periodic re-reading of the config file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::merger::CliOptions;
use super::types::ResolvedConfig;
use super::load_config;
use crate::error::ConfigError;

/// Holds the active configuration and refreshes it from disk when due.
///
/// A reload that fails to read, parse or validate keeps the previous
/// configuration. CLI overrides are re-applied on every reload.
pub struct ConfigReloader {
    path: Option<PathBuf>,
    cli: CliOptions,
    current: ResolvedConfig,
    last_load: Instant,
}

impl ConfigReloader {
    /// Load `path` (or defaults when `None`) and start the reload clock.
    pub fn new(path: Option<PathBuf>, cli: CliOptions) -> Result<Self, ConfigError> {
        let current = load_config(path.as_deref(), &cli)?;
        Ok(Self::with_config(path, cli, current))
    }

    /// Start from an already resolved configuration.
    pub fn with_config(path: Option<PathBuf>, cli: CliOptions, current: ResolvedConfig) -> Self {
        Self {
            path,
            cli,
            current,
            last_load: Instant::now(),
        }
    }

    pub fn current(&self) -> &ResolvedConfig {
        &self.current
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the reload interval has elapsed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_load) >= self.current.reload_interval()
    }

    /// Reload if the interval has elapsed. Returns true if the config changed.
    pub fn reload_if_due(&mut self) -> bool {
        self.reload_if_due_at(Instant::now())
    }

    pub fn reload_if_due_at(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.reload_at(now)
    }

    /// Reload unconditionally. Returns true if the config changed.
    pub fn reload(&mut self) -> bool {
        self.reload_at(Instant::now())
    }

    fn reload_at(&mut self, now: Instant) -> bool {
        self.last_load = now;

        let Some(ref path) = self.path else {
            return false;
        };

        let next = match load_config(Some(path), &self.cli) {
            Ok(next) => next,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config reload failed; keeping previous config");
                return false;
            }
        };

        if next == self.current {
            debug!(path = %path.display(), "config unchanged");
            return false;
        }

        info!(
            path = %path.display(),
            enabled = next.enabled,
            log_file = ?next.log_file,
            "config reloaded"
        );
        self.current = next;
        true
    }
}

impl std::fmt::Debug for ConfigReloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigReloader")
            .field("path", &self.path)
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(path: &Path, body: &str) {
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_new_without_file_uses_defaults() {
        let reloader = ConfigReloader::new(None, CliOptions::default()).unwrap();
        assert_eq!(reloader.current(), &ResolvedConfig::default());
        assert!(reloader.path().is_none());
    }

    #[test]
    fn test_new_with_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = ConfigReloader::new(Some(temp.path().join("missing.json")), CliOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_not_due_before_interval() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        write(&path, r#"{"enabled": false, "reload_interval_secs": 10}"#);

        let mut reloader = ConfigReloader::new(Some(path.clone()), CliOptions::default()).unwrap();
        write(&path, r#"{"enabled": true, "reload_interval_secs": 10}"#);

        let now = Instant::now();
        assert!(!reloader.reload_if_due_at(now));
        assert!(!reloader.current().enabled);

        assert!(reloader.reload_if_due_at(now + Duration::from_secs(11)));
        assert!(reloader.current().enabled);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        write(&path, r#"{"enabled": false}"#);

        let mut reloader = ConfigReloader::new(Some(path.clone()), CliOptions::default()).unwrap();
        write(
            &path,
            r#"{"enabled": true, "n8n_url": "http://localhost:5678/webhook/x"}"#,
        );

        assert!(reloader.reload());
        assert!(reloader.current().enabled);
        assert_eq!(
            reloader.current().webhook_url.as_deref(),
            Some("http://localhost:5678/webhook/x")
        );
    }

    #[test]
    fn test_failed_reload_keeps_previous() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        write(&path, r#"{"enabled": true}"#);

        let mut reloader = ConfigReloader::new(Some(path.clone()), CliOptions::default()).unwrap();

        write(&path, "{ broken");
        assert!(!reloader.reload());
        assert!(reloader.current().enabled);

        std::fs::remove_file(&path).unwrap();
        assert!(!reloader.reload());
        assert!(reloader.current().enabled);
    }

    #[test]
    fn test_invalid_values_rejected_on_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        write(&path, r#"{"enabled": true}"#);

        let mut reloader = ConfigReloader::new(Some(path.clone()), CliOptions::default()).unwrap();
        write(&path, r#"{"enabled": true, "idle_poll_ms": 0}"#);

        assert!(!reloader.reload());
        assert_eq!(reloader.current().idle_poll_ms, 500);
    }

    #[test]
    fn test_cli_overrides_survive_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        write(&path, r#"{"log_file": "/var/log/a.log"}"#);

        let cli = CliOptions {
            log_file: Some(PathBuf::from("/var/log/cli.log")),
            ..Default::default()
        };
        let mut reloader = ConfigReloader::new(Some(path.clone()), cli).unwrap();
        write(&path, r#"{"log_file": "/var/log/b.log", "enabled": true}"#);

        assert!(reloader.reload());
        assert_eq!(reloader.current().log_file, Some(PathBuf::from("/var/log/cli.log")));
    }
}
