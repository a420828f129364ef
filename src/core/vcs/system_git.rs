//! System git backend
//!
//! Uses git plumbing commands for the handful of operations patrol needs:
//! resolving revisions to trees, listing changed paths between two trees and
//! reading a file at a historical revision.
//!
//! All commands run with `-C <module dir>`, so diff paths and `<rev>:./path`
//! lookups are relative to the module root even when the module lives in a
//! subdirectory of the repository.

use crate::core::error::{GitError, PatrolError, PatrolResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Module directory all commands run from
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open the git repository containing `path`
  pub fn open(path: &Path) -> PatrolResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") || stderr.contains("cannot change to") {
        return Err(PatrolError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(PatrolError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    tracing::debug!(work_tree, module = %path.display(), "opened git repository");

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Working tree root of the repository
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Resolve a revision (sha, branch, tag, `HEAD~2`, ...) to its tree id
  pub fn resolve_tree(&self, revision: &str) -> PatrolResult<String> {
    let spec = format!("{}^{{tree}}", revision);
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &spec])
      .output()
      .context("Failed to run git rev-parse")?;

    if !output.status.success() {
      return Err(PatrolError::Git(GitError::RevisionNotFound {
        revision: revision.to_string(),
      }));
    }

    let tree = String::from_utf8_lossy(&output.stdout).trim().to_string();
    tracing::debug!(revision, tree = %tree, "resolved revision");
    Ok(tree)
  }

  /// Paths that differ between two trees, relative to the module directory.
  ///
  /// Renames are reported as a deletion plus an addition so both sides count.
  pub fn changed_files_between(&self, from_tree: &str, to_tree: &str) -> PatrolResult<Vec<String>> {
    let output = self
      .git_cmd()
      .args([
        "diff",
        "--name-only",
        "-z",
        "--no-renames",
        "--no-ext-diff",
        "--relative",
        from_tree,
        to_tree,
      ])
      .output()
      .context("Failed to run git diff")?;
    check_status(&output, "git diff --name-only")?;

    let files: Vec<String> = output
      .stdout
      .split(|b| *b == 0)
      .filter(|s| !s.is_empty())
      .map(|s| String::from_utf8_lossy(s).into_owned())
      .collect();

    tracing::debug!(count = files.len(), "changed files between trees");
    Ok(files)
  }

  /// Read a file (relative to the module directory) at a specific revision
  pub fn read_file_at(&self, revision: &str, path: &str) -> PatrolResult<Vec<u8>> {
    let spec = format!("{}:./{}", revision, path);

    let output = self
      .git_cmd()
      .args(["show", &spec])
      .output()
      .context("Failed to read file from revision")?;

    if !output.status.success() {
      return Err(PatrolError::Git(GitError::FileNotFound {
        revision: revision.to_string(),
        path: path.to_string(),
      }));
    }

    Ok(output.stdout)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to the module path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }
}

fn check_status(output: &Output, command: &str) -> PatrolResult<()> {
  if output.status.success() {
    return Ok(());
  }
  Err(PatrolError::Git(GitError::CommandFailed {
    command: command.to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
  }))
}
