//! `patrol -from=<rev> <path>` - Show which module packages are affected by changes
//!
//! This command:
//! - builds the import graph of the module's working tree
//! - diffs `<rev>` against HEAD and compares the go.mod `require` lists
//! - prints every module package that changed or imports something that changed

use crate::core::context::ModuleContext;
use crate::core::error::{PatrolResult, ResultExt};
use crate::core::vcs::SystemGit;
use crate::golang::ModFile;
use crate::golang::modfile::MODFILE_NAME;
use crate::graph::affected::analyze;
use crate::graph::{AffectedAnalysis, FileMode, PackageGraph, ScanOptions};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeSet;

/// Output format for the affected command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  /// One package import path per line
  Names,
  /// Full analysis as a JSON object
  Json,
}

/// Run the affected command
pub fn run_affected(ctx: &ModuleContext, from: &str, all_files: bool, format: OutputFormat) -> PatrolResult<()> {
  let mode = if all_files || ctx.config.changes.all_files {
    FileMode::AllFiles
  } else {
    FileMode::GoOnly
  };

  let options = ScanOptions {
    ignore_dirs: ctx.config.scan.ignore_dirs.clone(),
  };
  let mut graph = PackageGraph::build(ctx.module_root(), &ctx.modfile, &options)?;

  let git = SystemGit::open(ctx.module_root())?;
  tracing::debug!(work_tree = %git.work_tree().display(), "using repository");

  let changed_files = changed_files(&git, from)?;
  let changed_requirements = changed_requirements(&git, ctx, from)?;

  let analysis = analyze(&mut graph, &changed_files, &changed_requirements, mode);
  if analysis.is_empty() {
    tracing::info!(from, "no module packages affected");
  }

  display_results(&analysis, from, format)
}

/// Files that differ between `from` and HEAD, relative to the module root
fn changed_files(git: &SystemGit, from: &str) -> PatrolResult<Vec<String>> {
  let from_tree = git.resolve_tree(from)?;
  let head_tree = git.resolve_tree("HEAD")?;

  if from_tree == head_tree {
    return Ok(vec![]);
  }

  git.changed_files_between(&from_tree, &head_tree)
}

/// Requirement paths that differ between go.mod at `from` and the working tree
fn changed_requirements(git: &SystemGit, ctx: &ModuleContext, from: &str) -> PatrolResult<BTreeSet<String>> {
  let bytes = git
    .read_file_at(from, MODFILE_NAME)
    .with_context(|| format!("Failed to read {} at {}", MODFILE_NAME, from))?;
  let text = String::from_utf8_lossy(&bytes);
  let old = ModFile::parse(&format!("{}:{}", from, MODFILE_NAME), &text)?;

  Ok(ModFile::requirement_differences(&old, &ctx.modfile))
}

/// Display affected analysis results
fn display_results(analysis: &AffectedAnalysis, from: &str, format: OutputFormat) -> PatrolResult<()> {
  match format {
    OutputFormat::Names => display_names_only(analysis),
    OutputFormat::Json => display_json(analysis, from),
  }
}

/// Display only package names
fn display_names_only(analysis: &AffectedAnalysis) -> PatrolResult<()> {
  for name in &analysis.affected {
    println!("{}", name);
  }
  Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
  from: &'a str,
  #[serde(flatten)]
  analysis: &'a AffectedAnalysis,
}

/// Display results in JSON format
fn display_json(analysis: &AffectedAnalysis, from: &str) -> PatrolResult<()> {
  let report = JsonReport { from, analysis };
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}
