// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! [`VersionControl`] backed by the `git` command line.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use super::VersionControl;
use crate::error::VcsError;

/// Runs `git` subprocesses.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific git executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<Output, VcsError> {
        trace!(cwd = %cwd.display(), ?args, "running git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }

    /// Run a git command and return stdout, failing on a non-zero exit.
    async fn git(&self, cwd: &Path, args: &[&str]) -> Result<String, VcsError> {
        let output = self.run(cwd, args).await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(VcsError::command_failed(args.join(" "), stderr.trim()))
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn show_toplevel(&self, dir: &Path) -> Result<PathBuf, VcsError> {
        let stdout = self.git(dir, &["rev-parse", "--show-toplevel"]).await?;
        let toplevel = stdout.trim();
        if toplevel.is_empty() {
            return Err(VcsError::UnexpectedOutput {
                command: "rev-parse --show-toplevel".to_string(),
                message: "empty output".to_string(),
            });
        }
        Ok(PathBuf::from(toplevel))
    }

    async fn remote_origin_url(&self, dir: &Path) -> Result<Option<String>, VcsError> {
        let args = ["config", "--get", "remote.origin.url"];
        let output = self.run(dir, &args).await?;

        // `git config --get` exits with 1 when the key is simply not set.
        match output.status.code() {
            Some(0) => {
                let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok((!url.is_empty()).then_some(url))
            }
            Some(1) => Ok(None),
            _ => Err(VcsError::command_failed(
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim(),
            )),
        }
    }

    async fn blame_line(&self, repo_root: &Path, rel_path: &Path, line: u32) -> Result<String, VcsError> {
        let range = format!("{line},{line}");
        let rel = rel_path.to_string_lossy();
        self.git(repo_root, &["blame", "-L", &range, "--porcelain", "--", &rel])
            .await
    }

    async fn diff_file(&self, repo_root: &Path, rel_path: &Path) -> Result<String, VcsError> {
        let rel = rel_path.to_string_lossy();
        self.git(repo_root, &["diff", "--no-color", "--", &rel]).await
    }
}
