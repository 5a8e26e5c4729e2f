// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Turns an error trace into a provenance record.
//!
//! The first `in <file> on line <N>` reference in the trace decides which
//! source line is looked up. Traces without one are still delivered, just
//! without provenance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::blame::BlameResolver;
use crate::config::ResolvedConfig;
use crate::repo::RepoResolver;
use crate::types::{ErrorTrace, ProvenanceRecord};
use crate::vcs::VersionControl;
use crate::vhost::VhostResolver;

static SOURCE_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"in (.+?) on line (\d+)").unwrap());

/// A source location referenced by a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub file: String,
    pub line: u32,
}

/// Extract the first `in <file> on line <N>` reference from `text`.
pub fn extract_reference(text: &str) -> Option<SourceReference> {
    let caps = SOURCE_REFERENCE.captures(text)?;
    let file = caps[1].trim().to_string();
    let line: u32 = caps[2].parse().ok()?;
    if file.is_empty() || line == 0 {
        return None;
    }
    Some(SourceReference { file, line })
}

/// Vhost, repository and blame resolvers wired together.
pub struct EnrichmentPipeline {
    vhost: VhostResolver,
    repo: RepoResolver,
    blame: BlameResolver,
}

impl EnrichmentPipeline {
    pub fn new(vhost: VhostResolver, repo: RepoResolver, blame: BlameResolver) -> Self {
        Self { vhost, repo, blame }
    }

    /// Build the resolvers from configuration.
    pub fn from_config(config: &ResolvedConfig, vcs: Arc<dyn VersionControl>) -> Self {
        let cache = &config.cache;
        Self::new(
            VhostResolver::new(&config.vhost_dir),
            RepoResolver::with_config(vcs.clone(), cache.ttl(), cache.repo_capacity),
            BlameResolver::with_config(vcs, cache.ttl(), cache.blame_capacity),
        )
    }

    /// Provenance for `trace`, or `None` if it names no source line.
    #[instrument(skip_all, fields(lines = trace.len()))]
    pub async fn enrich(&self, trace: &ErrorTrace) -> Option<ProvenanceRecord> {
        let text = trace.text();
        let Some(reference) = extract_reference(&text) else {
            debug!("trace has no source reference");
            return None;
        };

        let file = Path::new(&reference.file);
        let dir = containing_dir(file);

        let (vhost, repo_root, git_remote) = tokio::join!(
            self.vhost.resolve(file),
            self.repo.root_of(&dir),
            self.repo.remote_of(&dir)
        );
        let blame = self
            .blame
            .blame(file, reference.line, repo_root.as_deref())
            .await;

        debug!(
            file = %reference.file,
            line = reference.line,
            vhost = ?vhost,
            repo_root = ?repo_root,
            "enriched trace"
        );

        Some(ProvenanceRecord {
            file: reference.file,
            line: reference.line,
            vhost: vhost.map(|v| v.trim().to_string()),
            git_remote: Some(git_remote),
            error_line: text.trim().to_string(),
            blame,
        })
    }
}

/// Absolute directory containing `file`.
fn containing_dir(file: &Path) -> PathBuf {
    let parent = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
}
