//! Module context - build once, pass everywhere
//!
//! ```text
//! main.rs:
//!   ModuleContext::build() -> &ModuleContext
//!   |
//!   v
//! commands/affected.rs:
//!   fn run_affected(ctx: &ModuleContext, ...)
//! ```

use crate::core::config::PatrolConfig;
use crate::core::error::{PatrolError, PatrolResult};
use crate::golang::ModFile;
use std::path::{Path, PathBuf};

/// Everything known about the module before any git or scan work starts.
#[derive(Debug, Clone)]
pub struct ModuleContext {
  /// Module root directory (absolute path, holds go.mod)
  pub root: PathBuf,

  /// Working tree go.mod
  pub modfile: ModFile,

  /// patrol.toml (defaults when absent)
  pub config: PatrolConfig,
}

impl ModuleContext {
  /// Build the context for the module at `module_root`.
  pub fn build(module_root: &Path, config_path: Option<&Path>) -> PatrolResult<Self> {
    let root = module_root.canonicalize().map_err(|e| {
      PatrolError::with_help(
        format!("Cannot access {}: {}", module_root.display(), e),
        "Pass the path of the directory that contains go.mod",
      )
    })?;

    let modfile = ModFile::load(&root)?;
    let config = PatrolConfig::load(&root, config_path)?;

    tracing::debug!(
      module = %modfile.module,
      requires = modfile.requires.len(),
      root = %root.display(),
      "loaded module"
    );

    Ok(Self { root, modfile, config })
  }

  /// Module root as Path reference (convenience)
  pub fn module_root(&self) -> &Path {
    &self.root
  }
}
