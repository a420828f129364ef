//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throw-away Go module inside a git repository
pub struct TestModule {
  _root: TempDir,
  /// Repository root
  pub repo: PathBuf,
  /// Module root (holds go.mod); equal to `repo` unless created with `in_subdir`
  pub path: PathBuf,
}

impl TestModule {
  /// Create a repository whose root is the module `module_path`
  pub fn new(module_path: &str) -> Result<Self> {
    Self::create(module_path, None)
  }

  /// Create a repository with the module living in `subdir`
  pub fn in_subdir(module_path: &str, subdir: &str) -> Result<Self> {
    Self::create(module_path, Some(subdir))
  }

  fn create(module_path: &str, subdir: Option<&str>) -> Result<Self> {
    let root = TempDir::new()?;
    let repo = root.path().to_path_buf();
    let path = match subdir {
      Some(dir) => repo.join(dir),
      None => repo.clone(),
    };
    std::fs::create_dir_all(&path)?;

    git(&repo, &["init", "--initial-branch=main"])?;
    git(&repo, &["config", "user.name", "Test User"])?;
    git(&repo, &["config", "user.email", "test@example.com"])?;
    git(&repo, &["config", "commit.gpgsign", "false"])?;

    let module = Self { _root: root, repo, path };
    module.write_go_mod(module_path, &[])?;
    Ok(module)
  }

  /// Rewrite go.mod with the given requirements
  pub fn write_go_mod(&self, module_path: &str, requires: &[(&str, &str)]) -> Result<()> {
    let mut content = format!("module {}\n\ngo 1.21\n", module_path);
    if !requires.is_empty() {
      content.push_str("\nrequire (\n");
      for (path, version) in requires {
        content.push_str(&format!("\t{} {}\n", path, version));
      }
      content.push_str(")\n");
    }
    self.write("go.mod", &content)
  }

  /// Write a Go file declaring `package` with the given imports
  pub fn write_go(&self, rel: &str, package: &str, imports: &[&str], body: &str) -> Result<()> {
    let mut content = format!("package {}\n\n", package);
    if !imports.is_empty() {
      content.push_str("import (\n");
      for import in imports {
        content.push_str(&format!("\t\"{}\"\n", import));
      }
      content.push_str(")\n\n");
    }
    content.push_str(body);
    content.push('\n');
    self.write(rel, &content)
  }

  /// Write any file relative to the module root
  pub fn write(&self, rel: &str, content: &str) -> Result<()> {
    let file = self.path.join(rel);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))?;
    Ok(())
  }

  /// Delete a file relative to the module root
  pub fn remove(&self, rel: &str) -> Result<()> {
    std::fs::remove_file(self.path.join(rel))?;
    Ok(())
  }

  /// Commit everything and return the commit SHA
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.repo, &["add", "-A"])?;
    git(&self.repo, &["commit", "--allow-empty", "-m", message])?;

    let output = git(&self.repo, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run patrol against this module and return the reported packages
  pub fn affected_since(&self, from: &str) -> Result<Vec<String>> {
    let path = self.path.display().to_string();
    let output = run_patrol(&self.repo, &["--from", from, &path])?;
    Ok(lines(&output))
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the patrol binary without checking the exit status
pub fn run_patrol_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let patrol_bin = env!("CARGO_BIN_EXE_patrol");

  Command::new(patrol_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run patrol")
}

/// Run the patrol binary and require success
pub fn run_patrol(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_patrol_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "patrol command failed: patrol {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Non-empty stdout lines
pub fn lines(output: &Output) -> Vec<String> {
  String::from_utf8_lossy(&output.stdout)
    .lines()
    .filter(|l| !l.trim().is_empty())
    .map(String::from)
    .collect()
}
