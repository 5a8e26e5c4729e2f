// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Repository root and remote lookup, cached per directory.
//!
//! Root and remote are cached independently. A directory outside any
//! repository has no root, but its remote is the literal `"unknown"`:
//! webhook consumers match on that string, so it is never turned into null.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{Clock, TimeBoundCache};
use crate::error::VcsError;
use crate::vcs::VersionControl;

/// Remote reported when none is configured or the lookup fails.
pub const UNKNOWN_REMOTE: &str = "unknown";

/// Default TTL for repository lookups (24 hours).
pub const DEFAULT_REPO_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default max entries per repository cache.
pub const DEFAULT_REPO_CAPACITY: usize = 1000;

/// Resolves the repository root and origin URL of directories.
pub struct RepoResolver {
    vcs: Arc<dyn VersionControl>,
    roots: TimeBoundCache<PathBuf, Option<PathBuf>>,
    remotes: TimeBoundCache<PathBuf, String>,
}

impl RepoResolver {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self::with_config(vcs, DEFAULT_REPO_TTL, DEFAULT_REPO_CAPACITY)
    }

    pub fn with_config(vcs: Arc<dyn VersionControl>, ttl: Duration, capacity: usize) -> Self {
        Self {
            vcs,
            roots: TimeBoundCache::with_default_ttl(ttl, capacity),
            remotes: TimeBoundCache::with_default_ttl(ttl, capacity),
        }
    }

    /// Replace the time source of both caches.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.roots = self.roots.with_clock(clock.clone());
        self.remotes = self.remotes.with_clock(clock);
        self
    }

    /// Repository root containing `dir`, or `None` outside a repository.
    pub async fn root_of(&self, dir: &Path) -> Option<PathBuf> {
        let key = dir.to_path_buf();
        if let Some(cached) = self.roots.get(&key) {
            return cached;
        }

        let root = match self.vcs.show_toplevel(dir).await {
            Ok(root) => Some(root),
            Err(VcsError::CommandFailed { stderr, .. }) => {
                debug!(dir = %dir.display(), "not inside a repository: {}", stderr);
                None
            }
            Err(e) => {
                warn!(dir = %dir.display(), "repository root lookup failed: {}", e);
                None
            }
        };

        self.roots.insert(key, root.clone());
        root
    }

    /// Origin URL for `dir`, or [`UNKNOWN_REMOTE`].
    pub async fn remote_of(&self, dir: &Path) -> String {
        let key = dir.to_path_buf();
        if let Some(cached) = self.remotes.get(&key) {
            return cached;
        }

        let remote = match self.vcs.remote_origin_url(dir).await {
            Ok(Some(url)) => url,
            Ok(None) => UNKNOWN_REMOTE.to_string(),
            Err(e) => {
                debug!(dir = %dir.display(), "remote lookup failed: {}", e);
                UNKNOWN_REMOTE.to_string()
            }
        };

        self.remotes.insert(key, remote.clone());
        remote
    }
}
