// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core type definitions shared across the pipeline.

use serde::{Deserialize, Serialize};

/// An ordered, non-empty group of log lines describing one error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTrace {
    lines: Vec<String>,
}

#[allow(clippy::len_without_is_empty)]
impl ErrorTrace {
    /// Build a trace from its lines. Returns `None` for an empty group.
    pub fn new(lines: Vec<String>) -> Option<Self> {
        if lines.is_empty() {
            None
        } else {
            Some(Self { lines })
        }
    }

    /// Lines in the order they were read.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The first line, which is the one that matched the start pattern.
    pub fn first_line(&self) -> &str {
        &self.lines[0]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Authorship of a single source line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameInfo {
    pub author: Option<String>,
    pub email: Option<String>,
    /// Commit hash truncated to 8 characters.
    pub commit: Option<String>,
    /// Commit summary, or a synthesized description of uncommitted changes.
    pub summary: Option<String>,
    /// True when the line only exists in the working tree.
    pub is_local_changes: bool,
}

/// Source-control provenance attached to a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub file: String,
    pub line: u32,
    pub vhost: Option<String>,
    pub git_remote: Option<String>,
    /// The trimmed trace text the reference was extracted from.
    pub error_line: String,
    pub blame: Option<BlameInfo>,
}

/// Body posted to the delivery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub error_line: String,
    pub error_detail: Option<ProvenanceRecord>,
}

impl DeliveryPayload {
    pub fn new(trace: &ErrorTrace, detail: Option<ProvenanceRecord>) -> Self {
        Self {
            error_line: trace.text(),
            error_detail: detail,
        }
    }
}
