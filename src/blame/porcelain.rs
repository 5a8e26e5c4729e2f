// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parser for `git blame --porcelain` output.

use crate::types::BlameInfo;

/// Length the commit hash is truncated to.
pub const SHORT_HASH_LEN: usize = 8;

/// Parse porcelain blame output for a single line.
///
/// Header lines start with the commit hash. A hash made only of zeros marks a
/// line that is not committed yet.
pub fn parse_porcelain(output: &str) -> BlameInfo {
    let mut blame = BlameInfo::default();

    for line in output.lines() {
        // Source content lines are tab-prefixed and never carry metadata.
        if line.starts_with('\t') {
            continue;
        }

        if let Some(author) = line.strip_prefix("author ") {
            blame.author = Some(author.to_string());
        } else if let Some(mail) = line.strip_prefix("author-mail ") {
            blame.email = Some(mail.trim_matches(['<', '>']).to_string());
        } else if let Some(summary) = line.strip_prefix("summary ") {
            blame.summary = Some(summary.to_string());
        } else if let Some(hash) = commit_hash(line) {
            blame.commit = Some(hash.chars().take(SHORT_HASH_LEN).collect());
        }

        if line.split_whitespace().next().is_some_and(is_unattributed) {
            blame.is_local_changes = true;
        }
    }

    blame
}

/// The leading hash of a header line (`<sha> <orig-line> <final-line> [<count>]`).
fn commit_hash(line: &str) -> Option<&str> {
    let token = line.split_whitespace().next()?;
    // 40 for SHA-1 repositories, 64 for SHA-256 ones.
    let is_hash = matches!(token.len(), 40 | 64) && token.bytes().all(|b| b.is_ascii_hexdigit());
    is_hash.then_some(token)
}

/// True for the all-zero id git uses for uncommitted lines.
pub fn is_unattributed(hash: &str) -> bool {
    (8..=40).contains(&hash.len()) && hash.bytes().all(|b| b == b'0')
}
