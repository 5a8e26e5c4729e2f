// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The long-running watch loop.
//!
//! One task tails the log, enriches each completed trace and hands it to the
//! dispatcher. The loop only ends on shutdown: a missing log file is retried
//! every reload interval, and lookup or delivery failures are logged and
//! dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ConfigReloader;
use crate::dispatch::Dispatcher;
use crate::error::WatchError;
use crate::grouper::LogTailer;
use crate::pipeline::EnrichmentPipeline;
use crate::telemetry::{MetricsSnapshot, WatcherMetrics};
use crate::types::{DeliveryPayload, ErrorTrace};

/// Lower bound on the wait between attempts to open the log file.
const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Tails, enriches and delivers until shut down.
pub struct LogWatcher {
    reloader: ConfigReloader,
    pipeline: EnrichmentPipeline,
    dispatcher: Arc<dyn Dispatcher>,
    metrics: Arc<WatcherMetrics>,
    shutdown: watch::Receiver<bool>,
}

impl LogWatcher {
    pub fn new(
        reloader: ConfigReloader,
        pipeline: EnrichmentPipeline,
        dispatcher: Arc<dyn Dispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            reloader,
            pipeline,
            dispatcher,
            metrics: Arc::new(WatcherMetrics::new()),
            shutdown,
        }
    }

    /// Shared handle to the counters, readable while the watcher runs.
    pub fn metrics(&self) -> Arc<WatcherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the shutdown signal fires. Returns the final counters.
    pub async fn run(mut self) -> MetricsSnapshot {
        'watch: while let Some(mut tailer) = self.open_tailer().await {
            loop {
                match tailer.next_trace().await {
                    Ok(Some(trace)) => {
                        self.handle_trace(trace).await;

                        let configured = self.reloader.current().log_file.as_deref();
                        if configured != Some(tailer.path()) {
                            info!(
                                from = %tailer.path().display(),
                                to = ?configured,
                                "log file changed; reopening"
                            );
                            continue 'watch;
                        }
                    }
                    Ok(None) => break 'watch,
                    Err(e) => {
                        error!(error = %e, "reading log file failed; reopening");
                        if !self.pause(self.retry_delay()).await {
                            break 'watch;
                        }
                        continue 'watch;
                    }
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            traces = snapshot.traces,
            delivered = snapshot.delivered,
            failed = snapshot.delivery_failures,
            uptime_secs = snapshot.uptime.as_secs(),
            "watcher stopped"
        );
        snapshot
    }

    /// Open the configured log file, retrying until it works or shutdown.
    async fn open_tailer(&mut self) -> Option<LogTailer> {
        loop {
            if *self.shutdown.borrow() {
                return None;
            }

            match self.try_open().await {
                Ok(tailer) => return Some(tailer),
                Err(e) => error!(
                    error = %e,
                    retry_in_ms = self.retry_delay().as_millis() as u64,
                    "cannot tail log file"
                ),
            }

            if !self.pause(self.retry_delay()).await {
                return None;
            }
            self.reloader.reload();
        }
    }

    async fn try_open(&self) -> Result<LogTailer, WatchError> {
        let config = self.reloader.current();
        let path = config.log_file.as_deref().ok_or(WatchError::NotConfigured)?;
        LogTailer::open(path, config.tailer_config(), self.shutdown.clone()).await
    }

    async fn handle_trace(&mut self, trace: ErrorTrace) {
        self.metrics.record_trace();
        self.reloader.reload_if_due();

        let config = self.reloader.current();
        if !config.enabled {
            debug!(first_line = trace.first_line(), "watcher disabled; trace skipped");
            self.metrics.record_skipped_disabled();
            return;
        }
        let Some(url) = config.webhook_url.clone() else {
            warn!(first_line = trace.first_line(), "no webhook configured; trace skipped");
            self.metrics.record_skipped_unconfigured();
            return;
        };

        let started = Instant::now();
        let detail = self.pipeline.enrich(&trace).await;
        self.metrics.record_enrichment(started.elapsed(), detail.is_some());

        let payload = DeliveryPayload::new(&trace, detail);
        let started = Instant::now();
        match self.dispatcher.deliver(&url, &payload).await {
            Ok(()) => {
                self.metrics.record_delivery(started.elapsed(), true);
                info!(
                    first_line = trace.first_line(),
                    lines = trace.len(),
                    file = payload.error_detail.as_ref().map(|d| d.file.as_str()),
                    "trace delivered"
                );
            }
            Err(e) => {
                self.metrics.record_delivery(started.elapsed(), false);
                warn!(error = %e, first_line = trace.first_line(), "trace delivery failed");
            }
        }
    }

    fn retry_delay(&self) -> Duration {
        self.reloader.current().reload_interval().max(MIN_RETRY_DELAY)
    }

    /// Sleep for `delay`. Returns false if shutdown was signalled meanwhile.
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            changed = self.shutdown.changed() => match changed {
                Ok(()) => !*self.shutdown.borrow(),
                Err(_) => {
                    tokio::time::sleep(delay).await;
                    true
                }
            },
        }
    }
}
