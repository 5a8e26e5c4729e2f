// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Virtual-host lookup for source files.
//!
//! A file belongs to the first host config (in file-name order) that mentions
//! one of its ancestor directories, nearest ancestor first. The filesystem root
//! itself is never searched for, since every config would match it.
//!
//! Results are memoized per file path for the lifetime of the process, misses
//! included. Host topology is assumed not to change while the watcher runs; a
//! changed `sites-enabled` directory is only picked up after a restart.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::TimeBoundCache;

/// Default Apache host-config directory.
pub const DEFAULT_VHOST_DIR: &str = "/etc/apache2/sites-enabled";

/// Maps source file paths to the host config that serves them.
pub struct VhostResolver {
    host_config_dir: PathBuf,
    cache: TimeBoundCache<PathBuf, Option<String>>,
}

impl VhostResolver {
    pub fn new(host_config_dir: impl Into<PathBuf>) -> Self {
        Self {
            host_config_dir: host_config_dir.into(),
            cache: TimeBoundCache::unbounded(),
        }
    }

    /// Host config path serving `file_path`, if any.
    pub async fn resolve(&self, file_path: &Path) -> Option<String> {
        let key = file_path.to_path_buf();
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let found = self.search(file_path).await;
        match &found {
            Some(vhost) => debug!(file = %file_path.display(), vhost = %vhost, "resolved vhost"),
            None => debug!(file = %file_path.display(), "no vhost references this file"),
        }
        self.cache.insert(key, found.clone());
        found
    }

    async fn search(&self, file_path: &Path) -> Option<String> {
        let mut search_path = file_path.parent()?;
        if is_root(search_path) {
            return None;
        }

        let configs = self.load_host_configs().await;
        if configs.is_empty() {
            return None;
        }

        while !is_root(search_path) {
            let needle = search_path.to_string_lossy();
            if let Some((path, _)) = configs.iter().find(|(_, body)| body.contains(needle.as_ref())) {
                return Some(path.display().to_string());
            }
            search_path = search_path.parent()?;
        }
        None
    }

    /// Host configs read off the async runtime.
    async fn load_host_configs(&self) -> Vec<(PathBuf, String)> {
        let dir = self.host_config_dir.clone();
        match tokio::task::spawn_blocking(move || read_host_configs(&dir)).await {
            Ok(configs) => configs,
            Err(e) => {
                warn!("Host config scan failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// The filesystem root, or an empty relative path.
fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

/// Read every regular file in `dir`, sorted by name.
fn read_host_configs(dir: &Path) -> Vec<(PathBuf, String)> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping host config entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| match std::fs::read(entry.path()) {
            Ok(bytes) => Some((
                entry.path().to_path_buf(),
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
            Err(e) => {
                warn!("Cannot read host config {}: {}", entry.path().display(), e);
                None
            }
        })
        .collect()
}
