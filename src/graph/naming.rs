//! Package naming rules shared by the graph builder and the change seeder.
//!
//! A directory relative to the module root maps to exactly one import path:
//! `vendor/<path>` is `<path>`, the root directory is the module path, and any
//! other directory is the module path joined with the directory.

const VENDOR_PREFIX: &str = "vendor/";

/// Import path of the package living in `rel_dir` (relative to the module root,
/// `/`-separated; `""` or `"."` is the root).
pub fn package_name_for_dir(module_path: &str, rel_dir: &str) -> String {
  let rel = normalize(rel_dir);

  if let Some(vendored) = rel.strip_prefix(VENDOR_PREFIX)
    && !vendored.is_empty()
  {
    return vendored.to_string();
  }

  if rel.is_empty() {
    module_path.to_string()
  } else {
    format!("{}/{}", module_path, rel)
  }
}

/// Import path of the package owning `rel_file`.
pub fn package_name_for_file(module_path: &str, rel_file: &str) -> String {
  package_name_for_dir(module_path, parent_dir(rel_file))
}

/// Whether a package belongs to the module itself.
///
/// A plain string prefix test, so `example.com/mx` is owned by `example.com/m`.
pub fn is_owned(module_path: &str, package_name: &str) -> bool {
  package_name.starts_with(module_path)
}

/// Parent of a `/`-separated relative path (`""` for top-level entries).
pub fn parent_dir(rel_path: &str) -> &str {
  let rel = rel_path.trim_end_matches('/');
  match rel.rfind('/') {
    Some(idx) => &rel[..idx],
    None => "",
  }
}

fn normalize(rel_dir: &str) -> String {
  let mut rel = rel_dir.replace('\\', "/");
  while let Some(stripped) = rel.strip_prefix("./") {
    rel = stripped.to_string();
  }
  if rel == "." {
    rel.clear();
  }
  rel.trim_end_matches('/').to_string()
}
