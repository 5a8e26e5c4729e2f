// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for tracewatch.
//!
//! Every concern gets its own `thiserror` enum. None of these errors is fatal to
//! the watcher: resolvers turn [`VcsError`] into absent values, the watcher logs
//! and drops [`DispatchError`], and [`WatchError`] only delays tailing until the
//! log file shows up. `anyhow` is used at the binary edge.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Errors returned by version-control queries.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`git {command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Unexpected output from `git {command}`: {message}")]
    UnexpectedOutput { command: String, message: String },
}

impl VcsError {
    /// Create a command failure from the git subcommand and its stderr.
    pub fn command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}

/// Errors that can occur while delivering a trace.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Delivery endpoint not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("Payload serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while following the log file.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Log file unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Log file not configured")]
    NotConfigured,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Create a source-unavailable error for `path`.
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.json");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_vcs_error_display() {
        let err = VcsError::command_failed("rev-parse --show-toplevel", "fatal: not a git repository");
        let display = err.to_string();
        assert!(display.contains("rev-parse"));
        assert!(display.contains("not a git repository"));
    }

    #[test]
    fn test_watch_error_display() {
        let err = WatchError::unavailable("/var/log/apache2/error.log", "No such file or directory");
        assert!(err.to_string().contains("/var/log/apache2/error.log"));
    }
}
