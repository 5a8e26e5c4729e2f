// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Polling follower for a growing log file.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, trace};

use super::{TailerConfig, TraceGrouper};
use crate::error::WatchError;
use crate::types::ErrorTrace;

/// Follows a log file from its current end and yields grouped traces.
pub struct LogTailer {
    path: PathBuf,
    reader: BufReader<File>,
    grouper: TraceGrouper,
    config: TailerConfig,
    /// Bytes of a line whose newline has not been written yet.
    fragment: Vec<u8>,
    shutdown: watch::Receiver<bool>,
}

impl LogTailer {
    /// Open `path` and position at its end. Existing content is ignored.
    pub async fn open(
        path: impl AsRef<Path>,
        config: TailerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, WatchError> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .await
            .map_err(|e| WatchError::unavailable(path, e))?;

        let metadata = file
            .metadata()
            .await
            .map_err(|e| WatchError::unavailable(path, e))?;
        if !metadata.is_file() {
            return Err(WatchError::unavailable(path, "not a regular file"));
        }

        let offset = file.seek(SeekFrom::End(0)).await?;
        info!(path = %path.display(), offset, "tailing log file");

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            grouper: TraceGrouper::new(config.quiet_period),
            config,
            fragment: Vec::new(),
            shutdown,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next completed trace.
    ///
    /// Returns `Ok(None)` once shutdown is signalled; an open trace is dropped.
    pub async fn next_trace(&mut self) -> Result<Option<ErrorTrace>, WatchError> {
        loop {
            if *self.shutdown.borrow() {
                self.discard_pending();
                return Ok(None);
            }

            if let Some(line) = self.read_line().await? {
                trace!(line = %line, "read line");
                if let Some(trace) = self.grouper.push_line(&line, Instant::now()) {
                    return Ok(Some(trace));
                }
                continue;
            }

            if let Some(trace) = self.grouper.poll_timeout(Instant::now()) {
                debug!(lines = trace.len(), "trace complete");
                return Ok(Some(trace));
            }

            let delay = if self.grouper.is_collecting() {
                self.config.collect_poll
            } else {
                self.config.idle_poll
            };
            if !self.pause(delay).await {
                self.discard_pending();
                return Ok(None);
            }
        }
    }

    /// Read one complete line, or `None` at end of file.
    async fn read_line(&mut self) -> Result<Option<String>, WatchError> {
        let read = self.reader.read_until(b'\n', &mut self.fragment).await?;
        if read == 0 || self.fragment.last() != Some(&b'\n') {
            return Ok(None);
        }

        let bytes = std::mem::take(&mut self.fragment);
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Sleep for `delay`. Returns false if shutdown was signalled meanwhile.
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            changed = self.shutdown.changed() => match changed {
                Ok(()) => !*self.shutdown.borrow(),
                // Sender gone: nobody can ask us to stop any more.
                Err(_) => {
                    tokio::time::sleep(delay).await;
                    true
                }
            },
        }
    }

    fn discard_pending(&mut self) {
        if self.grouper.is_collecting() {
            debug!(lines = self.grouper.pending_len(), "dropping open trace on shutdown");
        }
        let _ = self.grouper.flush();
    }
}
