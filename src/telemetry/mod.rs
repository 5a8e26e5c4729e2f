// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging and counters.
//!
//! Initialize once at startup:
//!
//! ```rust,ignore
//! use tracewatch::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::production())?;
//! ```
//!
//! Log levels: `trace` for every log line read, `debug` for resolver
//! decisions, `info` for traces delivered and config reloads, `warn` for
//! failed lookups and deliveries, `error` when the log file is unusable.

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{MetricsSnapshot, OperationMetrics, WatcherMetrics};
