//! Package import graph and change propagation
//!
//! Built on petgraph with our own node type; names are the only identity.

pub mod affected;
pub mod naming;
pub mod package_graph;

pub use affected::{AffectedAnalysis, FileMode};
pub use package_graph::{PackageGraph, ScanOptions};
