// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! tracewatch - web-server error traces with git provenance.
//!
//! Tails an Apache/PHP error log, groups multi-line error traces, works out
//! which virtual host, repository, commit and author the failing source line
//! belongs to, and posts the result to a webhook.
//!
//! # Architecture
//!
//! - [`grouper`] - Trace grouping and the polling log tailer
//! - [`pipeline`] - Source-reference extraction and enrichment
//! - [`vhost`] - Virtual-host lookup by searching host configs
//! - [`repo`] - Repository root and remote lookup
//! - [`blame`] - Line blame, including uncommitted changes
//! - [`vcs`] - The version-control seam and its git CLI implementation
//! - [`cache`] - TTL + LRU cache shared by the resolvers
//! - [`dispatch`] - Webhook delivery
//! - [`watcher`] - The long-running loop tying it all together
//! - [`config`] - Configuration loading, merging and reloading
//! - [`telemetry`] - Logging setup and counters
//! - [`types`] - Trace, provenance and payload types
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracewatch::config::{load_config, CliOptions};
//! use tracewatch::pipeline::EnrichmentPipeline;
//! use tracewatch::types::ErrorTrace;
//! use tracewatch::vcs::GitCli;
//!
//! let config = load_config(None, &CliOptions::default())?;
//! let pipeline = EnrichmentPipeline::from_config(&config, Arc::new(GitCli::new()));
//!
//! let trace = ErrorTrace::new(vec![
//!     "PHP Fatal error:  Uncaught Error in /var/www/site/index.php on line 12".to_string(),
//! ]).unwrap();
//! let record = pipeline.enrich(&trace).await;
//! ```

pub mod blame;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod grouper;
pub mod pipeline;
pub mod repo;
pub mod telemetry;
pub mod types;
pub mod vcs;
pub mod vhost;
pub mod watcher;

// Re-export commonly used types at crate root
pub use error::{ConfigError, DispatchError, Result, VcsError, WatchError};
pub use pipeline::EnrichmentPipeline;
pub use types::{BlameInfo, DeliveryPayload, ErrorTrace, ProvenanceRecord};
pub use watcher::LogWatcher;

/// tracewatch version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
