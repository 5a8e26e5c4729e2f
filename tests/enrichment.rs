// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end enrichment against a real git repository.
//!
//! Every test returns early when `git` is not installed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use tracewatch::blame::BlameResolver;
use tracewatch::pipeline::EnrichmentPipeline;
use tracewatch::repo::RepoResolver;
use tracewatch::types::ErrorTrace;
use tracewatch::vcs::{GitCli, VersionControl};
use tracewatch::vhost::VhostResolver;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=Ada Lovelace",
            "-c",
            "user.email=ada@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git runs");
    assert!(
        status.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&status.stderr)
    );
}

struct Site {
    _temp: TempDir,
    repo: PathBuf,
    vhost_dir: PathBuf,
}

/// A committed PHP app plus a host-config dir pointing at it.
fn site() -> Site {
    let temp = TempDir::new().unwrap();
    let base = fs::canonicalize(temp.path()).unwrap();

    let repo = base.join("www").join("shop");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::write(
        repo.join("src/cart.php"),
        "<?php\n$total = 0;\nforeach ($items as $item) {\n    $total += $item->price;\n}\n",
    )
    .unwrap();

    git(&repo, &["init", "-q"]);
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-q", "-m", "Add cart totals"]);

    let vhost_dir = base.join("sites-enabled");
    fs::create_dir_all(&vhost_dir).unwrap();
    fs::write(
        vhost_dir.join("shop.conf"),
        format!(
            "<VirtualHost *:80>\n  ServerName shop.example.com\n  DocumentRoot {}\n</VirtualHost>\n",
            repo.display()
        ),
    )
    .unwrap();

    Site {
        _temp: temp,
        repo,
        vhost_dir,
    }
}

fn pipeline(vhost_dir: &Path) -> EnrichmentPipeline {
    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli::new());
    EnrichmentPipeline::new(
        VhostResolver::new(vhost_dir),
        RepoResolver::new(vcs.clone()),
        BlameResolver::new(vcs),
    )
}

fn trace_for(file: &Path, line: u32) -> ErrorTrace {
    ErrorTrace::new(vec![
        format!(
            "PHP Warning:  Attempt to read property \"price\" on null in {} on line {}",
            file.display(),
            line
        ),
        "PHP Stack trace:".to_string(),
        "PHP   1. {main}() /var/www/index.php:0".to_string(),
    ])
    .unwrap()
}

// ============================================================================
// Committed lines
// ============================================================================

#[tokio::test]
async fn test_committed_line_is_attributed() {
    if !git_available() {
        return;
    }
    let site = site();
    let file = site.repo.join("src/cart.php");

    let record = pipeline(&site.vhost_dir)
        .enrich(&trace_for(&file, 4))
        .await
        .expect("trace has a source reference");

    assert_eq!(record.file, file.display().to_string());
    assert_eq!(record.line, 4);
    assert_eq!(
        record.vhost,
        Some(site.vhost_dir.join("shop.conf").display().to_string())
    );
    assert_eq!(record.git_remote.as_deref(), Some("unknown"));
    assert!(record.error_line.starts_with("PHP Warning:"));
    assert!(record.error_line.ends_with("{main}() /var/www/index.php:0"));

    let blame = record.blame.expect("committed line has blame");
    assert_eq!(blame.author.as_deref(), Some("Ada Lovelace"));
    assert_eq!(blame.email.as_deref(), Some("ada@example.com"));
    assert_eq!(blame.summary.as_deref(), Some("Add cart totals"));
    assert_eq!(blame.commit.as_ref().map(String::len), Some(8));
    assert!(!blame.is_local_changes);
}

#[tokio::test]
async fn test_remote_origin_is_reported() {
    if !git_available() {
        return;
    }
    let site = site();
    git(
        &site.repo,
        &["remote", "add", "origin", "git@git.example.com:web/shop.git"],
    );

    let record = pipeline(&site.vhost_dir)
        .enrich(&trace_for(&site.repo.join("src/cart.php"), 2))
        .await
        .unwrap();
    assert_eq!(record.git_remote.as_deref(), Some("git@git.example.com:web/shop.git"));
}

// ============================================================================
// Uncommitted changes
// ============================================================================

#[tokio::test]
async fn test_uncommitted_line_reports_diff() {
    if !git_available() {
        return;
    }
    let site = site();
    let file = site.repo.join("src/cart.php");
    fs::write(
        &file,
        "<?php\n$total = 0;\n$items = $items ?? [];\nforeach ($items as $item) {\n    $total += $item->price;\n}\n",
    )
    .unwrap();

    let record = pipeline(&site.vhost_dir)
        .enrich(&trace_for(&file, 3))
        .await
        .unwrap();

    let blame = record.blame.expect("modified line still has blame");
    assert!(blame.is_local_changes);
    let summary = blame.summary.unwrap();
    assert!(
        summary.starts_with("[Uncommitted changes] Last modified: "),
        "unexpected summary: {summary}"
    );
    assert!(
        summary.ends_with(" | Diff line: +$items = $items ?? [];"),
        "unexpected summary: {summary}"
    );
}

#[tokio::test]
async fn test_untracked_file_has_no_blame() {
    if !git_available() {
        return;
    }
    let site = site();
    let file = site.repo.join("src/new.php");
    fs::write(&file, "<?php\nundefined_call();\n").unwrap();

    let record = pipeline(&site.vhost_dir)
        .enrich(&trace_for(&file, 2))
        .await
        .unwrap();
    assert!(record.blame.is_none());
    assert!(record.vhost.is_some());
}

// ============================================================================
// Outside any repository
// ============================================================================

#[tokio::test]
async fn test_file_outside_repository() {
    if !git_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let base = fs::canonicalize(temp.path()).unwrap();
    // Keep git from finding a repository above the temp dir.
    std::env::set_var("GIT_CEILING_DIRECTORIES", &base);

    let dir = base.join("plain");
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("index.php");
    fs::write(&file, "<?php\nfoo();\n").unwrap();

    let record = pipeline(&base.join("no-sites"))
        .enrich(&trace_for(&file, 2))
        .await
        .unwrap();
    assert_eq!(record.vhost, None);
    assert_eq!(record.git_remote.as_deref(), Some("unknown"));
    assert_eq!(record.blame, None);
}

#[tokio::test]
async fn test_trace_without_reference() {
    let temp = TempDir::new().unwrap();
    let trace = ErrorTrace::new(vec![
        "[error] [client 192.0.2.7] AH01276: Cannot serve directory /var/www/html/".to_string(),
    ])
    .unwrap();

    assert!(pipeline(temp.path()).enrich(&trace).await.is_none());
}
