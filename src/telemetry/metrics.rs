// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Watcher counters and timings.
//!
//! Lock-free counters plus two duration summaries. The watcher logs a
//! snapshot on shutdown; nothing is exported.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Counters for one watcher run.
#[derive(Debug)]
pub struct WatcherMetrics {
    traces: AtomicU64,
    enriched: AtomicU64,
    delivered: AtomicU64,
    delivery_failures: AtomicU64,
    skipped_disabled: AtomicU64,
    skipped_unconfigured: AtomicU64,
    enrichment: RwLock<OperationMetrics>,
    delivery: RwLock<OperationMetrics>,
    start_time: Instant,
}

impl WatcherMetrics {
    pub fn new() -> Self {
        Self {
            traces: AtomicU64::new(0),
            enriched: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            skipped_disabled: AtomicU64::new(0),
            skipped_unconfigured: AtomicU64::new(0),
            enrichment: RwLock::new(OperationMetrics::new()),
            delivery: RwLock::new(OperationMetrics::new()),
            start_time: Instant::now(),
        }
    }

    /// A trace was completed by the grouper.
    pub fn record_trace(&self) {
        self.traces.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_disabled(&self) {
        self.skipped_disabled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_unconfigured(&self) {
        self.skipped_unconfigured.fetch_add(1, Ordering::Relaxed);
    }

    /// Enrichment finished; `with_provenance` is false when the trace named no source line.
    pub fn record_enrichment(&self, duration: Duration, with_provenance: bool) {
        if with_provenance {
            self.enriched.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut ops) = self.enrichment.write() {
            ops.record(duration);
        }
    }

    pub fn record_delivery(&self, duration: Duration, success: bool) {
        if success {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut ops) = self.delivery.write() {
            ops.record(duration);
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let read = |lock: &RwLock<OperationMetrics>| lock.read().map(|m| m.clone()).unwrap_or_default();

        MetricsSnapshot {
            traces: self.traces.load(Ordering::Relaxed),
            enriched: self.enriched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            skipped_disabled: self.skipped_disabled.load(Ordering::Relaxed),
            skipped_unconfigured: self.skipped_unconfigured.load(Ordering::Relaxed),
            enrichment: read(&self.enrichment),
            delivery: read(&self.delivery),
            uptime: self.uptime(),
        }
    }
}

impl Default for WatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Duration summary for a repeated operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub min_duration: Option<Duration>,
    pub max_duration: Duration,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = Some(self.min_duration.map_or(duration, |min| min.min(duration)));
        self.max_duration = self.max_duration.max(duration);
    }

    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

/// Point-in-time copy of [`WatcherMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub traces: u64,
    pub enriched: u64,
    pub delivered: u64,
    pub delivery_failures: u64,
    pub skipped_disabled: u64,
    pub skipped_unconfigured: u64,
    pub enrichment: OperationMetrics,
    pub delivery: OperationMetrics,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} traces, {} enriched, {} delivered, {} failed, {} skipped (disabled), {} skipped (no webhook), avg delivery {:?}",
            self.traces,
            self.enriched,
            self.delivered,
            self.delivery_failures,
            self.skipped_disabled,
            self.skipped_unconfigured,
            self.delivery.average(),
        )
    }
}
