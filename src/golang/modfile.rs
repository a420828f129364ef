//! go.mod reader
//!
//! Only the parts that matter for change detection are kept: the module path and
//! the `require` list. Other directives are recognised and skipped so that a
//! well-formed go.mod never fails to load.

use crate::core::error::{ConfigError, PatrolResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// File name of the module descriptor.
pub const MODFILE_NAME: &str = "go.mod";

/// Directives that may appear in a go.mod but carry nothing patrol needs.
const IGNORED_DIRECTIVES: &[&str] = &["go", "toolchain", "replace", "exclude", "retract", "godebug", "tool", "ignore"];

/// A required external module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
  pub path: String,
  pub version: String,
}

/// Parsed go.mod.
#[derive(Debug, Clone)]
pub struct ModFile {
  /// Module path from the `module` directive
  pub module: String,
  /// `require` entries in file order
  pub requires: Vec<Requirement>,
}

impl ModFile {
  /// Load `go.mod` from a module directory.
  pub fn load(module_dir: &Path) -> PatrolResult<Self> {
    let path = module_dir.join(MODFILE_NAME);
    let text = fs::read_to_string(&path).map_err(|_| ConfigError::ModFileNotFound {
      module_dir: module_dir.to_path_buf(),
    })?;
    Self::parse(&path.display().to_string(), &text)
  }

  /// Parse go.mod text. `source_name` is only used in error messages.
  pub fn parse(source_name: &str, text: &str) -> PatrolResult<Self> {
    let invalid = |line: usize, reason: String| ConfigError::ModFileInvalid {
      file: source_name.to_string(),
      line,
      reason,
    };

    let mut module: Option<String> = None;
    let mut requires = Vec::new();
    // Some(directive) while inside a `directive ( ... )` block
    let mut block: Option<(String, usize)> = None;

    for (idx, raw) in text.lines().enumerate() {
      let lineno = idx + 1;
      let fields = tokenize(strip_comment(raw)).map_err(|reason| invalid(lineno, reason))?;
      if fields.is_empty() {
        continue;
      }

      if let Some((directive, _)) = &block {
        if fields.len() == 1 && fields[0] == ")" {
          block = None;
          continue;
        }
        if directive == "require" {
          requires.push(parse_requirement(&fields).map_err(|reason| invalid(lineno, reason))?);
        }
        continue;
      }

      let directive = fields[0].as_str();
      let args = &fields[1..];

      if args.len() == 1 && args[0] == "(" {
        if directive != "require" && !IGNORED_DIRECTIVES.contains(&directive) {
          return Err(invalid(lineno, format!("unknown block type: {}", directive)).into());
        }
        block = Some((directive.to_string(), lineno));
        continue;
      }

      match directive {
        "module" => {
          if module.is_some() {
            return Err(invalid(lineno, "repeated module statement".to_string()).into());
          }
          if args.len() != 1 {
            return Err(invalid(lineno, "usage: module module/path".to_string()).into());
          }
          module = Some(args[0].clone());
        }
        "require" => {
          requires.push(parse_requirement(args).map_err(|reason| invalid(lineno, reason))?);
        }
        d if IGNORED_DIRECTIVES.contains(&d) => {}
        other => {
          return Err(invalid(lineno, format!("unknown directive: {}", other)).into());
        }
      }
    }

    if let Some((directive, start)) = block {
      return Err(invalid(start, format!("unterminated {} block", directive)).into());
    }

    let module = module.ok_or_else(|| invalid(1, "no module declaration".to_string()))?;

    Ok(Self { module, requires })
  }

  /// Paths added, removed or re-versioned between `old` and `new`.
  pub fn requirement_differences(old: &ModFile, new: &ModFile) -> BTreeSet<String> {
    let old_versions = old.versions();
    let new_versions = new.versions();

    let mut differences = BTreeSet::new();
    for (path, version) in &old_versions {
      if new_versions.get(path) != Some(version) {
        differences.insert(path.to_string());
      }
    }
    for (path, version) in &new_versions {
      if old_versions.get(path) != Some(version) {
        differences.insert(path.to_string());
      }
    }
    differences
  }

  /// The requirement an import path belongs to, if any.
  ///
  /// The longest matching requirement wins, so nested modules such as
  /// `example.com/dep/v2` are preferred over `example.com/dep`.
  pub fn owning_requirement(&self, import_path: &str) -> Option<&Requirement> {
    self
      .requires
      .iter()
      .filter(|req| path_has_prefix(import_path, &req.path))
      .max_by_key(|req| req.path.len())
  }

  fn versions(&self) -> BTreeMap<&str, &str> {
    self
      .requires
      .iter()
      .map(|r| (r.path.as_str(), r.version.as_str()))
      .collect()
  }
}

/// `path` equals `prefix` or lies below it on a `/` boundary.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
  match path.strip_prefix(prefix) {
    Some(rest) => rest.is_empty() || rest.starts_with('/'),
    None => false,
  }
}

fn parse_requirement(args: &[String]) -> Result<Requirement, String> {
  match args {
    [path, version] => Ok(Requirement {
      path: path.clone(),
      version: version.clone(),
    }),
    _ => Err("usage: require module/path v1.2.3".to_string()),
  }
}

fn strip_comment(line: &str) -> &str {
  // `//` inside a quoted path is vanishingly rare in go.mod; quotes are honoured anyway.
  let bytes = line.as_bytes();
  let mut quote: Option<u8> = None;
  let mut i = 0;
  while i < bytes.len() {
    let b = bytes[i];
    match quote {
      Some(q) => {
        if b == b'\\' && q == b'"' {
          i += 1;
        } else if b == q {
          quote = None;
        }
      }
      None => {
        if b == b'"' || b == b'`' {
          quote = Some(b);
        } else if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
          return &line[..i];
        }
      }
    }
    i += 1;
  }
  line
}

fn tokenize(line: &str) -> Result<Vec<String>, String> {
  let mut fields = Vec::new();
  let mut chars = line.chars().peekable();

  while let Some(&c) = chars.peek() {
    if c.is_whitespace() {
      chars.next();
      continue;
    }
    match c {
      '(' | ')' => {
        fields.push(c.to_string());
        chars.next();
      }
      '"' | '`' => {
        chars.next();
        let mut value = String::new();
        let mut closed = false;
        while let Some(ch) = chars.next() {
          if ch == c {
            closed = true;
            break;
          }
          if ch == '\\' && c == '"' {
            if let Some(escaped) = chars.next() {
              value.push(escaped);
            }
            continue;
          }
          value.push(ch);
        }
        if !closed {
          return Err("unterminated quoted string".to_string());
        }
        fields.push(value);
      }
      _ => {
        let mut value = String::new();
        while let Some(&ch) = chars.peek() {
          if ch.is_whitespace() || ch == '(' || ch == ')' {
            break;
          }
          value.push(ch);
          chars.next();
        }
        fields.push(value);
      }
    }
  }

  Ok(fields)
}
