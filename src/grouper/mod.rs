// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Grouping of raw log lines into error traces.
//!
//! [`TraceGrouper`] is the state machine: it is fed lines together with the
//! instant they were read and decides when a trace is complete. It never reads
//! a clock itself. [`LogTailer`] drives it from a growing file.
//!
//! ```text
//! Idle ──(line matches start pattern)──▶ Collecting
//!  ▲                                        │ any line: append, restart quiet period
//!  └────────(quiet period elapsed: emit)────┘
//! ```
//!
//! While collecting, every line is appended, including lines that look like the
//! start of another error. Errors logged in a burst end up in one trace.

mod tailer;

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ErrorTrace;

pub use tailer::LogTailer;

static ERROR_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PHP (?:Fatal error|Warning|Notice)|\[error\]").unwrap());

/// Default gap after which a trace is considered complete.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(2);

/// Default delay between end-of-file checks while idle.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(500);

/// Default delay between end-of-file checks while a trace is open.
pub const DEFAULT_COLLECT_POLL: Duration = Duration::from_millis(200);

/// Whether `line` opens a new error trace.
pub fn is_error_start(line: &str) -> bool {
    ERROR_START.is_match(line)
}

/// Timing parameters for tailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailerConfig {
    pub quiet_period: Duration,
    pub idle_poll: Duration,
    pub collect_poll: Duration,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            idle_poll: DEFAULT_IDLE_POLL,
            collect_poll: DEFAULT_COLLECT_POLL,
        }
    }
}

/// Line-by-line trace grouping state.
#[derive(Debug)]
pub struct TraceGrouper {
    quiet_period: Duration,
    pending: Vec<String>,
    last_line_at: Option<Instant>,
}

impl TraceGrouper {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: Vec::new(),
            last_line_at: None,
        }
    }

    /// True while a trace is open.
    pub fn is_collecting(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Lines buffered in the open trace.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Instant at which the open trace will be emitted if nothing else arrives.
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.last_line_at.map(|at| at + self.quiet_period)
    }

    /// Feed a line read at `now`.
    ///
    /// Returns the previous trace when this line arrives after its quiet period
    /// ran out, which can only happen if the caller did not poll in between.
    pub fn push_line(&mut self, line: &str, now: Instant) -> Option<ErrorTrace> {
        let line = line.trim_end();
        let completed = self.poll_timeout(now);

        if self.pending.is_empty() && !is_error_start(line) {
            return completed;
        }

        self.pending.push(line.to_string());
        self.last_line_at = Some(now);
        completed
    }

    /// Emit the open trace if its quiet period has elapsed at `now`.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<ErrorTrace> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Emit the open trace unconditionally.
    pub fn flush(&mut self) -> Option<ErrorTrace> {
        self.last_line_at = None;
        ErrorTrace::new(std::mem::take(&mut self.pending))
    }
}

impl Default for TraceGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
