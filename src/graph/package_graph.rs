//! Package import graph built from a Go module's working tree
//!
//! ## Graph Structure
//!
//! - **Directed Graph**: `A → B` means "A imports B"
//! - **Nodes**: Packages (module packages, vendored packages, stdlib and external imports)
//! - **Dependants**: incoming neighbours of a node
//! - **Index**: name → node, so a package first seen as an import target and later
//!   scanned as a directory (or the other way round) is one node

use super::naming::{is_owned, package_name_for_dir};
use crate::core::error::PatrolResult;
use crate::golang::imports::{DirScan, scan_dir};
use crate::golang::modfile::ModFile;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory that is never scanned.
const VCS_DIR: &str = ".git";

/// A package node in the import graph.
#[derive(Debug, Clone)]
pub struct PackageNode {
  pub name: String,
  /// Set once when the node is created
  pub owned_by_module: bool,
  /// Monotonic: only ever goes from false to true
  pub changed: bool,
}

/// Options for walking the module tree.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
  /// Directory names skipped in addition to `.git`
  pub ignore_dirs: Vec<String>,
}

impl ScanOptions {
  fn ignores(&self, name: &str) -> bool {
    name == VCS_DIR || self.ignore_dirs.iter().any(|d| d == name)
  }
}

/// Import graph of a Go module.
pub struct PackageGraph {
  /// Module path the ownership rule is computed against
  module_path: String,

  /// Nodes: PackageNode, edges: importer → imported
  graph: DiGraph<PackageNode, ()>,

  /// Index: package name → node index
  name_to_node: HashMap<String, NodeIndex>,
}

impl PackageGraph {
  /// Create an empty graph for a module.
  pub fn new(module_path: impl Into<String>) -> Self {
    Self {
      module_path: module_path.into(),
      graph: DiGraph::new(),
      name_to_node: HashMap::new(),
    }
  }

  /// Build the graph from every directory under `module_dir`.
  ///
  /// Directories are parsed in parallel; the results are folded into the graph
  /// afterwards by this thread alone, in path order.
  pub fn build(module_dir: &Path, modfile: &ModFile, options: &ScanOptions) -> PatrolResult<Self> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(module_dir)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|entry| {
        entry.depth() == 0 || !(entry.file_type().is_dir() && options.ignores(&entry.file_name().to_string_lossy()))
      });
    for entry in walker {
      let entry = entry?;
      if entry.file_type().is_dir() {
        dirs.push(entry.into_path());
      }
    }

    tracing::debug!(dirs = dirs.len(), root = %module_dir.display(), "scanning module directories");

    let scans: Vec<Option<DirScan>> = dirs.par_iter().map(|dir| scan_dir(dir)).collect::<PatrolResult<_>>()?;

    let mut graph = Self::new(modfile.module.clone());
    for scan in scans.into_iter().flatten() {
      let rel_dir = relative_dir(module_dir, &scan.dir);
      let name = package_name_for_dir(&graph.module_path, &rel_dir);
      tracing::trace!(package = %name, imports = scan.imports.len(), "adding package");
      graph.add_package(&name, scan.imports.iter().map(String::as_str), modfile);
    }

    if graph.is_empty() {
      tracing::warn!(root = %module_dir.display(), "no Go packages found");
    }
    tracing::debug!(
      packages = graph.len(),
      edges = graph.edge_count(),
      "built package graph"
    );
    Ok(graph)
  }

  /// Record a scanned package and its imports.
  ///
  /// Every import that falls under a required module also links the package to
  /// that module's root path, so a version bump reaches importers of any of its
  /// sub-packages.
  pub fn add_package<'a>(&mut self, name: &str, imports: impl IntoIterator<Item = &'a str>, modfile: &ModFile) {
    let importer = self.upsert(name);

    for import in imports {
      self.add_import(importer, import);

      if let Some(requirement) = modfile.owning_requirement(import)
        && requirement.path != import
      {
        self.add_import(importer, &requirement.path);
      }
    }
  }

  /// Get or create the node for a package name.
  pub fn upsert(&mut self, name: &str) -> NodeIndex {
    if let Some(idx) = self.name_to_node.get(name) {
      return *idx;
    }

    let node = PackageNode {
      name: name.to_string(),
      owned_by_module: is_owned(&self.module_path, name),
      changed: false,
    };
    let idx = self.graph.add_node(node);
    self.name_to_node.insert(name.to_string(), idx);
    idx
  }

  /// Record that `importer` imports `imported`; repeated calls add one edge.
  pub fn add_import(&mut self, importer: NodeIndex, imported: &str) -> NodeIndex {
    let target = self.upsert(imported);
    self.graph.update_edge(importer, target, ());
    target
  }

  /// Flag a package as changed by name.
  ///
  /// Returns false when the graph has no such package.
  pub fn flag(&mut self, name: &str) -> bool {
    match self.name_to_node.get(name) {
      Some(idx) => {
        self.graph[*idx].changed = true;
        true
      }
      None => false,
    }
  }

  /// Flag a node; returns true if it was not flagged before.
  pub fn flag_node(&mut self, idx: NodeIndex) -> bool {
    let node = &mut self.graph[idx];
    let newly = !node.changed;
    node.changed = true;
    newly
  }

  /// Packages that import `idx`.
  pub fn dependants(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
    self.graph.neighbors_directed(idx, Direction::Incoming)
  }

  /// Indices of every flagged node.
  pub fn changed_nodes(&self) -> Vec<NodeIndex> {
    self
      .graph
      .node_indices()
      .filter(|idx| self.graph[*idx].changed)
      .collect()
  }

  /// Whether a package with this name exists.
  pub fn contains(&self, name: &str) -> bool {
    self.name_to_node.contains_key(name)
  }

  /// All package nodes.
  pub fn packages(&self) -> impl Iterator<Item = &PackageNode> {
    self.graph.node_weights()
  }

  pub fn module_path(&self) -> &str {
    &self.module_path
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }
}

#[cfg(test)]
impl PackageGraph {
  /// Look up a package by name.
  pub fn package(&self, name: &str) -> Option<&PackageNode> {
    self.name_to_node.get(name).map(|idx| &self.graph[*idx])
  }

  /// Direct importers of a package, sorted by name.
  pub fn direct_dependants(&self, name: &str) -> Vec<String> {
    let Some(idx) = self.name_to_node.get(name) else {
      return vec![];
    };
    let mut names: Vec<String> = self.dependants(*idx).map(|d| self.graph[d].name.clone()).collect();
    names.sort();
    names.dedup();
    names
  }
}

/// `/`-separated path of `dir` relative to `root` (empty for the root itself).
fn relative_dir(root: &Path, dir: &Path) -> String {
  let rel = dir.strip_prefix(root).unwrap_or(dir);
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
