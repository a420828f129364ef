//! Affected package analysis
//!
//! Given the changed files and the changed `require` entries between two revisions:
//! - Seed: flag the packages that own those files or are those requirements
//! - Propagate: flag every transitive importer of a flagged package
//! - Report: the flagged packages that belong to the module

use super::naming::{package_name_for_dir, package_name_for_file, parent_dir};
use super::package_graph::PackageGraph;
use crate::golang::imports::GO_EXTENSION;
use serde::Serialize;
use std::collections::BTreeSet;

/// Which changed files count as package changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
  /// Only Go source files
  #[default]
  GoOnly,
  /// Any file; non-Go files count for the nearest enclosing package
  AllFiles,
}

/// Complete affected analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AffectedAnalysis {
  /// Module path
  pub module: String,

  /// Files that changed
  pub changed_files: Vec<String>,

  /// Requirements added, removed or re-versioned
  pub changed_requirements: Vec<String>,

  /// Packages flagged before propagation (module-owned or not)
  pub direct: Vec<String>,

  /// Module packages affected, sorted
  pub affected: Vec<String>,
}

impl AffectedAnalysis {
  pub fn is_empty(&self) -> bool {
    self.affected.is_empty()
  }
}

/// Run seed → propagate → report over a freshly built graph.
pub fn analyze(
  graph: &mut PackageGraph,
  changed_files: &[String],
  changed_requirements: &BTreeSet<String>,
  mode: FileMode,
) -> AffectedAnalysis {
  let mut direct = seed_files(graph, changed_files, mode);
  direct.extend(seed_requirements(graph, changed_requirements));

  let propagated = propagate(graph);
  let affected = report(graph);

  tracing::info!(
    direct = direct.len(),
    propagated,
    affected = affected.len(),
    "affected analysis complete"
  );

  AffectedAnalysis {
    module: graph.module_path().to_string(),
    changed_files: changed_files.to_vec(),
    changed_requirements: changed_requirements.iter().cloned().collect(),
    direct: direct.into_iter().collect(),
    affected,
  }
}

/// Flag the packages owning the changed files.
///
/// Files whose package is not in the graph (deleted directories, files outside
/// any package) are skipped.
pub fn seed_files(graph: &mut PackageGraph, changed_files: &[String], mode: FileMode) -> BTreeSet<String> {
  let module_path = graph.module_path().to_string();
  let mut flagged = BTreeSet::new();

  for file in changed_files {
    let owner = if is_go_path(file) {
      Some(package_name_for_file(&module_path, file))
    } else if mode == FileMode::AllFiles {
      enclosing_package(graph, &module_path, file)
    } else {
      None
    };

    let Some(name) = owner else {
      tracing::trace!(file = %file, "ignoring non-source change");
      continue;
    };

    if graph.flag(&name) {
      tracing::debug!(file = %file, package = %name, "package changed");
      flagged.insert(name);
    } else {
      tracing::debug!(file = %file, package = %name, "changed file has no package in the graph");
    }
  }

  flagged
}

/// Flag the nodes named after changed requirements.
pub fn seed_requirements(graph: &mut PackageGraph, changed_requirements: &BTreeSet<String>) -> BTreeSet<String> {
  let mut flagged = BTreeSet::new();
  for path in changed_requirements {
    if graph.flag(path) {
      tracing::debug!(requirement = %path, "requirement changed");
      flagged.insert(path.clone());
    } else {
      tracing::debug!(requirement = %path, "changed requirement is not imported");
    }
  }
  flagged
}

/// Flag every transitive importer of a flagged package.
///
/// Worklist over the reversed edges; the `changed` flag doubles as the visited
/// set, so cycles and self-imports terminate and each edge is walked once.
/// Returns the number of packages flagged here.
pub fn propagate(graph: &mut PackageGraph) -> usize {
  let mut stack = graph.changed_nodes();
  let mut newly_flagged = 0;

  while let Some(idx) = stack.pop() {
    let dependants: Vec<_> = graph.dependants(idx).collect();
    for dependant in dependants {
      if graph.flag_node(dependant) {
        newly_flagged += 1;
        stack.push(dependant);
      }
    }
  }

  newly_flagged
}

/// Names of changed module packages, sorted.
pub fn report(graph: &PackageGraph) -> Vec<String> {
  let mut names: Vec<String> = graph
    .packages()
    .filter(|p| p.owned_by_module && p.changed)
    .map(|p| p.name.clone())
    .collect();
  names.sort();
  names
}

fn is_go_path(file: &str) -> bool {
  file
    .rsplit_once('.')
    .is_some_and(|(stem, ext)| ext == GO_EXTENSION && !stem.is_empty() && !stem.ends_with('/'))
}

/// Nearest package directory at or above the file's directory.
///
/// The walk never leaves `vendor/` for the module's own packages.
fn enclosing_package(graph: &PackageGraph, module_path: &str, file: &str) -> Option<String> {
  let mut dir = parent_dir(file);
  loop {
    if dir == "vendor" {
      return None;
    }
    let name = package_name_for_dir(module_path, dir);
    if graph.contains(&name) {
      return Some(name);
    }
    if dir.is_empty() {
      return None;
    }
    dir = parent_dir(dir);
  }
}
