// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Locate a working-tree line inside a unified diff.

use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -\d+(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Position inside the hunk currently being scanned.
struct Hunk {
    /// New-file number of the next context or added line.
    next_line: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl Hunk {
    fn parse(header: &str) -> Option<Self> {
        let caps = HUNK_HEADER.captures(header)?;
        let count = |i: usize| -> Option<u32> { caps.get(i).map_or(Some(1), |m| m.as_str().parse().ok()) };
        Some(Self {
            next_line: caps[2].parse().ok()?,
            old_remaining: count(1)?,
            new_remaining: count(3)?,
        })
    }

    fn is_done(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

/// Find the diff line that is line `line_number` of the new file.
///
/// Context (` `) and added (`+`) lines occupy a new-file line number; removed
/// (`-`) lines do not and are never returned. Returns the raw diff line,
/// including its marker.
pub fn find_new_file_line(diff: &str, line_number: u32) -> Option<&str> {
    let mut hunk: Option<Hunk> = None;

    for line in diff.lines() {
        if line.starts_with("@@") {
            hunk = Hunk::parse(line);
            continue;
        }

        let Some(current) = hunk.as_mut() else {
            continue;
        };

        match line.as_bytes().first() {
            Some(b' ') => {
                if current.next_line == line_number {
                    return Some(line);
                }
                current.next_line += 1;
                current.old_remaining = current.old_remaining.saturating_sub(1);
                current.new_remaining = current.new_remaining.saturating_sub(1);
            }
            Some(b'+') => {
                if current.next_line == line_number {
                    return Some(line);
                }
                current.next_line += 1;
                current.new_remaining = current.new_remaining.saturating_sub(1);
            }
            Some(b'-') => {
                current.old_remaining = current.old_remaining.saturating_sub(1);
            }
            // "\ No newline at end of file"
            _ => continue,
        }

        if current.is_done() {
            hunk = None;
        }
    }

    None
}
