// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Version-control queries used by the enrichment resolvers.
//!
//! The resolvers only need four read-only questions answered, so they depend on
//! the narrow [`VersionControl`] trait instead of on `git` directly. [`GitCli`]
//! answers them by running the `git` binary; tests substitute a mock.

mod git;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::VcsError;

pub use git::GitCli;

/// Read-only version-control capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Top-level directory of the repository containing `dir`.
    async fn show_toplevel(&self, dir: &Path) -> Result<PathBuf, VcsError>;

    /// Configured `remote.origin.url` for `dir`, or `None` if unset.
    async fn remote_origin_url(&self, dir: &Path) -> Result<Option<String>, VcsError>;

    /// Porcelain blame output for exactly one line of `rel_path`.
    async fn blame_line(&self, repo_root: &Path, rel_path: &Path, line: u32) -> Result<String, VcsError>;

    /// Unified diff of `rel_path` against the working tree.
    async fn diff_file(&self, repo_root: &Path, rel_path: &Path) -> Result<String, VcsError>;
}
