use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// The three repository operations a run needs.
pub trait VersionControl {
    /// Porcelain status of the working tree; empty when clean.
    fn status(&self) -> Result<String>;

    /// Stage every change and commit it.
    fn commit_all(&self, message: &str) -> Result<()>;

    fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Drives the `git` command-line tool inside one working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    work_tree: PathBuf,
}

impl GitCli {
    pub fn new(work_tree: &Path) -> Self {
        Self::with_binary(find_git_binary(), work_tree)
    }

    pub fn with_binary(binary: impl Into<PathBuf>, work_tree: &Path) -> Self {
        Self {
            binary: binary.into(),
            work_tree: work_tree.to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let rendered = format!("git {}", args.join(" "));
        tracing::debug!(command = %rendered, cwd = %self.work_tree.display(), "running");
        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.work_tree)
            .output()
            .with_context(|| format!("failed to execute {}", self.binary.display()))?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            bail!(
                "`{rendered}` exited with code {}: {detail}",
                output
                    .status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "<signal>".to_string())
            );
        }
        Ok(stdout)
    }
}

impl VersionControl for GitCli {
    fn status(&self) -> Result<String> {
        Ok(self.run(&["status", "--porcelain"])?.trim_end().to_string())
    }

    fn commit_all(&self, message: &str) -> Result<()> {
        self.run(&["add", "-A"])?;
        self.run(&["commit", "-m", message])?;
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", remote, branch])?;
        Ok(())
    }
}

/// `RAWFIX_GIT` when set, otherwise `git` from PATH.
pub fn find_git_binary() -> PathBuf {
    env::var("RAWFIX_GIT")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("git"))
}
