//! Imports-only Go source reader
//!
//! Parses a Go file with tree-sitter and reads the package clause and the import
//! declarations that follow it. Anything after the last leading import is not
//! looked at, like `go/parser` in ImportsOnly mode.

use crate::core::error::{PatrolResult, ResultExt, ScanError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::Chars;
use tree_sitter::{Node, Parser};

/// Extension of Go source files.
pub const GO_EXTENSION: &str = "go";

/// Suffix marking an external test package (`package foo_test`).
const EXTERNAL_TEST_SUFFIX: &str = "_test";

/// Package clause and imports of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoFileHeader {
  pub package: String,
  pub imports: Vec<String>,
}

/// Result of scanning a single directory.
#[derive(Debug, Clone)]
pub struct DirScan {
  /// Directory that was scanned
  pub dir: PathBuf,
  /// Package names declared by the non-test files
  pub packages: BTreeSet<String>,
  /// Unique import paths over all non-test files
  pub imports: BTreeSet<String>,
}

/// Whether a path names a Go source file.
pub fn is_go_file(path: &Path) -> bool {
  path.extension().is_some_and(|ext| ext == GO_EXTENSION)
}

/// Scan every Go file directly inside `dir`.
///
/// Files of an external test package are excluded. Returns `None` when the
/// directory holds no remaining Go files.
pub fn scan_dir(dir: &Path) -> PatrolResult<Option<DirScan>> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))? {
    let entry = entry?;
    let path = entry.path();
    if entry.file_type()?.is_file() && is_go_file(&path) {
      files.push(path);
    }
  }
  if files.is_empty() {
    return Ok(None);
  }
  files.sort();

  let mut parser = HeaderParser::new()?;
  let mut packages = BTreeSet::new();
  let mut imports = BTreeSet::new();

  for file in files {
    let source = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let header = parser.parse(&source).map_err(|reason| ScanError::Parse {
      file: file.clone(),
      reason,
    })?;

    if header.package.ends_with(EXTERNAL_TEST_SUFFIX) {
      tracing::trace!(file = %file.display(), "skipping external test file");
      continue;
    }

    packages.insert(header.package);
    imports.extend(header.imports);
  }

  if packages.is_empty() {
    return Ok(None);
  }

  Ok(Some(DirScan {
    dir: dir.to_path_buf(),
    packages,
    imports,
  }))
}

/// A tree-sitter parser loaded with the Go grammar.
///
/// Not shareable across threads; each directory scan creates its own.
pub struct HeaderParser {
  parser: Parser,
}

impl HeaderParser {
  pub fn new() -> PatrolResult<Self> {
    let mut parser = Parser::new();
    parser
      .set_language(&tree_sitter_go::LANGUAGE.into())
      .map_err(|e| ScanError::Grammar { reason: e.to_string() })?;
    Ok(Self { parser })
  }

  /// Parse the package clause and leading import declarations of `source`.
  ///
  /// Syntax errors inside the header, or directly after the last import, are
  /// fatal. Errors further down the file are ignored.
  pub fn parse(&mut self, source: &str) -> Result<GoFileHeader, String> {
    // a UTF-8 BOM is allowed at the start of a Go file
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let tree = self
      .parser
      .parse(source, None)
      .ok_or_else(|| "parser returned no syntax tree".to_string())?;
    read_header(tree.root_node(), source.as_bytes())
  }
}

fn read_header(root: Node<'_>, src: &[u8]) -> Result<GoFileHeader, String> {
  let mut package = None;
  let mut imports = Vec::new();

  let mut cursor = root.walk();
  for node in root.named_children(&mut cursor) {
    if node.is_extra() {
      continue;
    }
    match (node.kind(), package.is_some()) {
      ("package_clause", false) => package = Some(package_name(node, src)?),
      ("import_declaration", true) => import_paths(node, src, &mut imports)?,
      (_, false) => return Err(syntax_error(node, "expected package clause")),
      _ if node.is_error() || node.is_missing() => {
        return Err(syntax_error(node, "syntax error after import declarations"));
      }
      _ => break,
    }
  }

  let package = package.ok_or_else(|| "expected package clause, found end of file".to_string())?;
  Ok(GoFileHeader { package, imports })
}

fn package_name(clause: Node<'_>, src: &[u8]) -> Result<String, String> {
  if clause.has_error() {
    return Err(syntax_error(clause, "malformed package clause"));
  }
  let mut cursor = clause.walk();
  let name = clause
    .named_children(&mut cursor)
    .find(|n| n.kind() == "package_identifier")
    .ok_or_else(|| syntax_error(clause, "package clause has no name"))?;
  node_text(name, src).map(str::to_string)
}

fn import_paths(decl: Node<'_>, src: &[u8], imports: &mut Vec<String>) -> Result<(), String> {
  if decl.has_error() {
    return Err(syntax_error(decl, "malformed import declaration"));
  }

  let mut cursor = decl.walk();
  for child in decl.named_children(&mut cursor) {
    match child.kind() {
      "import_spec" => imports.push(import_path(child, src)?),
      "import_spec_list" => {
        let mut specs = child.walk();
        for spec in child.named_children(&mut specs) {
          if spec.kind() == "import_spec" {
            imports.push(import_path(spec, src)?);
          }
        }
      }
      _ => {}
    }
  }
  Ok(())
}

fn import_path(spec: Node<'_>, src: &[u8]) -> Result<String, String> {
  let path = spec
    .child_by_field_name("path")
    .ok_or_else(|| syntax_error(spec, "import has no path"))?;
  let literal = node_text(path, src)?;

  match path.kind() {
    "interpreted_string_literal" => unquote_interpreted(literal).map_err(|reason| syntax_error(path, &reason)),
    "raw_string_literal" => Ok(unquote_raw(literal)),
    other => Err(syntax_error(path, &format!("unexpected {} as import path", other))),
  }
}

fn node_text<'s>(node: Node<'_>, src: &'s [u8]) -> Result<&'s str, String> {
  node.utf8_text(src).map_err(|e| syntax_error(node, &e.to_string()))
}

fn syntax_error(node: Node<'_>, reason: &str) -> String {
  let pos = node.start_position();
  format!("{}:{}: {}", pos.row + 1, pos.column + 1, reason)
}

fn unquote_raw(literal: &str) -> String {
  literal.trim_matches('`').replace('\r', "")
}

/// Decode a double-quoted Go string literal, escapes included.
fn unquote_interpreted(literal: &str) -> Result<String, String> {
  let body = literal
    .strip_prefix('"')
    .and_then(|s| s.strip_suffix('"'))
    .ok_or_else(|| format!("malformed string literal {}", literal))?;

  let mut out = Vec::with_capacity(body.len());
  let mut chars = body.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      push_char(&mut out, c);
      continue;
    }

    let escape = chars.next().ok_or("unterminated escape sequence")?;
    match escape {
      'a' => out.push(0x07),
      'b' => out.push(0x08),
      'f' => out.push(0x0c),
      'n' => out.push(b'\n'),
      'r' => out.push(b'\r'),
      't' => out.push(b'\t'),
      'v' => out.push(0x0b),
      '\\' => out.push(b'\\'),
      '"' => out.push(b'"'),
      // \x and octal escapes are single bytes
      'x' => out.push(digits(&mut chars, 16, 2)? as u8),
      '0'..='7' => {
        let value = escape.to_digit(8).unwrap_or(0) * 64 + digits(&mut chars, 8, 2)?;
        let byte = u8::try_from(value).map_err(|_| format!("octal escape value {} > 255", value))?;
        out.push(byte);
      }
      'u' | 'U' => {
        let width = if escape == 'u' { 4 } else { 8 };
        let code = digits(&mut chars, 16, width)?;
        let ch = char::from_u32(code).ok_or_else(|| format!("escape sequence is invalid Unicode code point {:#x}", code))?;
        push_char(&mut out, ch);
      }
      other => return Err(format!("unknown escape sequence \\{}", other)),
    }
  }

  String::from_utf8(out).map_err(|_| "import path is not valid UTF-8".to_string())
}

fn digits(chars: &mut Chars<'_>, radix: u32, count: usize) -> Result<u32, String> {
  let mut value = 0u32;
  for _ in 0..count {
    let digit = chars
      .next()
      .and_then(|c| c.to_digit(radix))
      .ok_or_else(|| format!("escape sequence needs {} base-{} digits", count, radix))?;
    value = value * radix + digit;
  }
  Ok(value)
}

fn push_char(out: &mut Vec<u8>, c: char) {
  let mut buf = [0u8; 4];
  out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
