// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Line-level authorship lookup.
//!
//! Committed lines are attributed from `git blame`. Lines git reports under the
//! all-zero commit only exist in the working tree; for those the summary is
//! replaced by the file's modification time and the matching line of
//! `git diff`, which is more useful to whoever has to fix the error than the
//! placeholder summary git prints.
//!
//! Results, including failures, are cached per `file:line`.

mod diff;
mod porcelain;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, SecondsFormat};
use tracing::{debug, warn};

use crate::cache::{Clock, TimeBoundCache};
use crate::error::VcsError;
use crate::types::BlameInfo;
use crate::vcs::VersionControl;

pub use diff::find_new_file_line;
pub use porcelain::{is_unattributed, parse_porcelain, SHORT_HASH_LEN};

/// Default TTL for blame results (24 hours).
pub const DEFAULT_BLAME_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default max cached blame results.
pub const DEFAULT_BLAME_CAPACITY: usize = 5000;

/// Resolves and caches blame information per source line.
pub struct BlameResolver {
    vcs: Arc<dyn VersionControl>,
    cache: TimeBoundCache<String, Option<BlameInfo>>,
}

impl BlameResolver {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self::with_config(vcs, DEFAULT_BLAME_TTL, DEFAULT_BLAME_CAPACITY)
    }

    pub fn with_config(vcs: Arc<dyn VersionControl>, ttl: Duration, capacity: usize) -> Self {
        Self {
            vcs,
            cache: TimeBoundCache::with_default_ttl(ttl, capacity),
        }
    }

    /// Replace the cache's time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    /// Cache key for a source line.
    pub fn cache_key(file_path: &Path, line_number: u32) -> String {
        format!("{}:{}", file_path.display(), line_number)
    }

    /// Blame `line_number` of `file_path`.
    ///
    /// Returns `None` when the file is not under version control or any git
    /// query fails.
    pub async fn blame(
        &self,
        file_path: &Path,
        line_number: u32,
        repo_root: Option<&Path>,
    ) -> Option<BlameInfo> {
        let repo_root = repo_root?;

        let key = Self::cache_key(file_path, line_number);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let blame = match self.query(file_path, line_number, repo_root).await {
            Ok(blame) => Some(blame),
            Err(e) => {
                warn!(file = %file_path.display(), line = line_number, "blame failed: {}", e);
                None
            }
        };

        self.cache.insert(key, blame.clone());
        blame
    }

    async fn query(&self, file_path: &Path, line_number: u32, repo_root: &Path) -> Result<BlameInfo, VcsError> {
        let rel_path = relative_to_repo(file_path, repo_root).await;
        let output = self.vcs.blame_line(repo_root, &rel_path, line_number).await?;
        let mut blame = parse_porcelain(&output);

        if blame.is_local_changes {
            debug!(file = %file_path.display(), line = line_number, "line has uncommitted changes");
            let diff = self.vcs.diff_file(repo_root, &rel_path).await?;
            let modified = last_modified(file_path).await;
            blame.summary = Some(uncommitted_summary(
                &modified,
                find_new_file_line(&diff, line_number),
            ));
        }

        Ok(blame)
    }
}

/// Summary used for lines that are not committed yet.
pub fn uncommitted_summary(last_modified: &str, diff_line: Option<&str>) -> String {
    let mut summary = format!("[Uncommitted changes] Last modified: {last_modified}");
    if let Some(line) = diff_line {
        summary.push_str(" | Diff line: ");
        summary.push_str(line.trim());
    }
    summary
}

/// Path of `file_path` relative to `repo_root`.
///
/// git reports the root with symlinks resolved, so the canonical file path is
/// tried too. Falls back to the path as given, which git also accepts.
async fn relative_to_repo(file_path: &Path, repo_root: &Path) -> PathBuf {
    if let Ok(rel) = file_path.strip_prefix(repo_root) {
        return rel.to_path_buf();
    }

    if let Ok(canonical) = tokio::fs::canonicalize(file_path).await {
        if let Ok(rel) = canonical.strip_prefix(repo_root) {
            return rel.to_path_buf();
        }
    }

    file_path.to_path_buf()
}

/// File modification time as ISO 8601 in local time.
async fn last_modified(file_path: &Path) -> String {
    match tokio::fs::metadata(file_path).await.and_then(|m| m.modified()) {
        Ok(mtime) => DateTime::<Local>::from(mtime).to_rfc3339_opts(SecondsFormat::Secs, false),
        Err(e) => {
            debug!(file = %file_path.display(), "cannot read modification time: {}", e);
            "unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::MockVersionControl;
    use tempfile::TempDir;

    const COMMITTED: &str = "\
3f5e9a1c0b7d2e4f6a8c1b3d5e7f9a0b2c4d6e8f 7 7 1
author Ada Lovelace
author-mail <ada@example.com>
summary Guard against empty carts
filename cart.php
\tfoo();
";

    const UNCOMMITTED: &str = "\
0000000000000000000000000000000000000000 7 7 1
author Not Committed Yet
author-mail <not.committed.yet>
summary Version of cart.php from cart.php
filename cart.php
\tfoo();
";

    const DIFF: &str = "\
--- a/cart.php
+++ b/cart.php
@@ -5,3 +5,4 @@
 {
     $total = 0;
+foo();
     return $total;
";

    #[tokio::test]
    async fn test_blame_without_repo_is_none() {
        let vcs = MockVersionControl::new();
        let resolver = BlameResolver::new(Arc::new(vcs));
        assert_eq!(resolver.blame(Path::new("/srv/a.php"), 3, None).await, None);
    }

    #[tokio::test]
    async fn test_blame_committed_line_is_cached() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_blame_line()
            .withf(|root, rel, line| root == Path::new("/srv/app") && rel == Path::new("src/cart.php") && *line == 7)
            .times(1)
            .returning(|_, _, _| Ok(COMMITTED.to_string()));
        vcs.expect_diff_file().never();

        let resolver = BlameResolver::new(Arc::new(vcs));
        let file = Path::new("/srv/app/src/cart.php");
        let root = Some(Path::new("/srv/app"));

        let first = resolver.blame(file, 7, root).await.unwrap();
        assert_eq!(first.commit.as_deref(), Some("3f5e9a1c"));
        assert_eq!(first.summary.as_deref(), Some("Guard against empty carts"));
        assert!(!first.is_local_changes);

        let second = resolver.blame(file, 7, root).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_blame_uncommitted_line_uses_diff() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("cart.php");
        std::fs::write(&file, "<?php\n").unwrap();

        let mut vcs = MockVersionControl::new();
        vcs.expect_blame_line()
            .times(1)
            .returning(|_, _, _| Ok(UNCOMMITTED.to_string()));
        vcs.expect_diff_file()
            .withf(|_, rel| rel == Path::new("cart.php"))
            .times(1)
            .returning(|_, _| Ok(DIFF.to_string()));

        let resolver = BlameResolver::new(Arc::new(vcs));
        let blame = resolver.blame(&file, 7, Some(temp.path())).await.unwrap();

        assert!(blame.is_local_changes);
        let summary = blame.summary.unwrap();
        assert!(summary.starts_with("[Uncommitted changes] Last modified: "));
        assert!(summary.ends_with(" | Diff line: +foo();"));
        assert!(!summary.contains("Version of"));
    }

    #[tokio::test]
    async fn test_blame_uncommitted_without_matching_diff_line() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_blame_line()
            .returning(|_, _, _| Ok(UNCOMMITTED.to_string()));
        vcs.expect_diff_file().returning(|_, _| Ok(String::new()));

        let resolver = BlameResolver::new(Arc::new(vcs));
        let blame = resolver
            .blame(Path::new("/srv/app/gone.php"), 7, Some(Path::new("/srv/app")))
            .await
            .unwrap();

        assert_eq!(
            blame.summary.as_deref(),
            Some("[Uncommitted changes] Last modified: unknown")
        );
    }

    #[tokio::test]
    async fn test_blame_failure_is_cached_as_none() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_blame_line()
            .times(1)
            .returning(|_, _, _| Err(VcsError::command_failed("blame", "fatal: no such path")));

        let resolver = BlameResolver::new(Arc::new(vcs));
        let file = Path::new("/srv/app/missing.php");
        let root = Some(Path::new("/srv/app"));
        assert_eq!(resolver.blame(file, 1, root).await, None);
        assert_eq!(resolver.blame(file, 1, root).await, None);
    }

    #[tokio::test]
    async fn test_diff_failure_yields_none() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_blame_line()
            .returning(|_, _, _| Ok(UNCOMMITTED.to_string()));
        vcs.expect_diff_file()
            .returning(|_, _| Err(VcsError::command_failed("diff", "fatal")));

        let resolver = BlameResolver::new(Arc::new(vcs));
        let blame = resolver
            .blame(Path::new("/srv/app/cart.php"), 7, Some(Path::new("/srv/app")))
            .await;
        assert_eq!(blame, None);
    }

    #[tokio::test]
    async fn test_blame_keys_on_line() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_blame_line()
            .times(2)
            .returning(|_, _, _| Ok(COMMITTED.to_string()));

        let resolver = BlameResolver::new(Arc::new(vcs));
        let file = Path::new("/srv/app/cart.php");
        let root = Some(Path::new("/srv/app"));
        resolver.blame(file, 7, root).await;
        resolver.blame(file, 8, root).await;
        resolver.blame(file, 7, root).await;
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            BlameResolver::cache_key(Path::new("/srv/app/cart.php"), 42),
            "/srv/app/cart.php:42"
        );
    }

    #[test]
    fn test_uncommitted_summary() {
        assert_eq!(
            uncommitted_summary("2026-01-02T03:04:05+00:00", Some("+foo();  ")),
            "[Uncommitted changes] Last modified: 2026-01-02T03:04:05+00:00 | Diff line: +foo();"
        );
        assert_eq!(
            uncommitted_summary("unknown", None),
            "[Uncommitted changes] Last modified: unknown"
        );
    }

    #[tokio::test]
    async fn test_relative_to_repo() {
        assert_eq!(
            relative_to_repo(Path::new("/srv/app/src/a.php"), Path::new("/srv/app")).await,
            PathBuf::from("src/a.php")
        );
        assert_eq!(
            relative_to_repo(Path::new("/elsewhere/a.php"), Path::new("/srv/app")).await,
            PathBuf::from("/elsewhere/a.php")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_to_repo_through_symlink() {
        let temp = TempDir::new().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap().join("repo");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/a.php"), "<?php\n").unwrap();
        let link = temp.path().join("current");
        std::os::unix::fs::symlink(&root, &link).unwrap();

        assert_eq!(
            relative_to_repo(&link.join("src/a.php"), &root).await,
            PathBuf::from("src/a.php")
        );
    }
}
