//! Integration tests for affected package detection

use crate::helpers::{TestModule, run_patrol};
use anyhow::Result;

const MODULE: &str = "example.com/m";

/// main → pkg/a → pkg/b
fn layered_module() -> Result<(TestModule, String)> {
  let m = TestModule::new(MODULE)?;
  m.write_go("main.go", "main", &["example.com/m/pkg/a"], "func main() { a.A() }")?;
  m.write_go("pkg/a/a.go", "a", &["example.com/m/pkg/b"], "func A() { b.B() }")?;
  m.write_go("pkg/b/b.go", "b", &["strings"], "func B() { _ = strings.ToUpper(\"b\") }")?;
  m.write_go("pkg/c/c.go", "c", &[], "func C() {}")?;
  let base = m.commit("layered module")?;
  Ok((m, base))
}

#[test]
fn test_internal_change_flags_importers() -> Result<()> {
  let (m, base) = layered_module()?;

  m.write_go("pkg/b/b.go", "b", &["strings"], "func B() { _ = strings.ToLower(\"B\") }")?;
  m.commit("change b")?;

  assert_eq!(
    m.affected_since(&base)?,
    vec!["example.com/m", "example.com/m/pkg/a", "example.com/m/pkg/b"]
  );
  Ok(())
}

#[test]
fn test_leaf_change_only_flags_itself() -> Result<()> {
  let (m, base) = layered_module()?;

  m.write_go("pkg/c/c.go", "c", &[], "func C() { println(1) }")?;
  m.commit("change c")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/c"]);
  Ok(())
}

#[test]
fn test_same_revision_is_empty() -> Result<()> {
  let (m, _base) = layered_module()?;
  assert!(m.affected_since("HEAD")?.is_empty());
  Ok(())
}

#[test]
fn test_non_go_changes_are_ignored_by_default() -> Result<()> {
  let (m, base) = layered_module()?;

  m.write("pkg/b/README.md", "# b\n")?;
  m.commit("docs")?;

  assert!(m.affected_since(&base)?.is_empty());
  Ok(())
}

#[test]
fn test_requirement_version_bump() -> Result<()> {
  let m = TestModule::new(MODULE)?;
  m.write_go_mod(MODULE, &[("example.com/dep", "v1.0.0"), ("example.com/other", "v0.1.0")])?;
  m.write_go("pkg/c/c.go", "c", &["example.com/dep/sub"], "var _ = sub.X")?;
  m.write_go("pkg/e/e.go", "e", &["example.com/m/pkg/c"], "var _ = c.X")?;
  m.write_go("pkg/o/o.go", "o", &["example.com/other"], "var _ = other.X")?;
  let base = m.commit("deps")?;

  m.write_go_mod(MODULE, &[("example.com/dep", "v1.1.0"), ("example.com/other", "v0.1.0")])?;
  m.commit("bump dep")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/c", "example.com/m/pkg/e"]);
  Ok(())
}

#[test]
fn test_removed_requirement() -> Result<()> {
  let m = TestModule::new(MODULE)?;
  m.write_go_mod(MODULE, &[("example.com/dep", "v1.0.0"), ("example.com/other", "v0.1.0")])?;
  m.write_go("pkg/o/o.go", "o", &["example.com/other"], "var _ = other.X")?;
  let base = m.commit("deps")?;

  m.write_go_mod(MODULE, &[("example.com/dep", "v1.0.0")])?;
  m.commit("drop other")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/o"]);
  Ok(())
}

#[test]
fn test_vendored_change() -> Result<()> {
  let m = TestModule::new(MODULE)?;
  m.write_go_mod(MODULE, &[("example.com/dep", "v1.0.0")])?;
  m.write_go("vendor/example.com/dep/sub/sub.go", "sub", &[], "var X = 1")?;
  m.write("vendor/modules.txt", "# example.com/dep v1.0.0\nexample.com/dep/sub\n")?;
  m.write_go("pkg/d/d.go", "d", &["example.com/dep/sub"], "var _ = sub.X")?;
  m.write_go("pkg/z/z.go", "z", &[], "var Z = 1")?;
  let base = m.commit("vendored dep")?;

  m.write_go("vendor/example.com/dep/sub/sub.go", "sub", &[], "var X = 2")?;
  m.commit("patch vendored copy")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/d"]);
  Ok(())
}

#[test]
fn test_external_test_package_does_not_loop() -> Result<()> {
  let m = TestModule::new(MODULE)?;
  m.write_go("pkg/x/x.go", "x", &[], "func X() int { return 1 }")?;
  m.write_go(
    "pkg/x/x_test.go",
    "x_test",
    &["testing", "example.com/m/pkg/x"],
    "func TestX(t *testing.T) { _ = x.X() }",
  )?;
  m.write_go("pkg/y/y.go", "y", &["example.com/m/pkg/x"], "var _ = x.X")?;
  let base = m.commit("x with external tests")?;

  m.write_go("pkg/x/x.go", "x", &[], "func X() int { return 2 }")?;
  m.commit("change x")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/x", "example.com/m/pkg/y"]);
  Ok(())
}

#[test]
fn test_deleted_file_flags_its_package() -> Result<()> {
  let (m, base) = layered_module()?;

  m.write_go("pkg/b/extra.go", "b", &[], "var Extra = 1")?;
  let with_extra = m.commit("add extra")?;
  m.remove("pkg/b/extra.go")?;
  m.commit("remove extra")?;

  let expected = vec!["example.com/m", "example.com/m/pkg/a", "example.com/m/pkg/b"];
  assert_eq!(m.affected_since(&with_extra)?, expected);
  // the file round-tripped, but HEAD differs from base only in history
  assert!(m.affected_since(&base)?.is_empty());
  Ok(())
}

#[test]
fn test_idempotent() -> Result<()> {
  let (m, base) = layered_module()?;
  m.write_go("pkg/a/a.go", "a", &["example.com/m/pkg/b"], "func A() { b.B(); b.B() }")?;
  m.commit("change a")?;

  let first = m.affected_since(&base)?;
  let second = m.affected_since(&base)?;
  assert_eq!(first, second);
  assert_eq!(first, vec!["example.com/m", "example.com/m/pkg/a"]);
  Ok(())
}

#[test]
fn test_module_in_subdirectory() -> Result<()> {
  let m = TestModule::in_subdir("example.com/svc", "services/svc")?;
  m.write_go("api/api.go", "api", &["example.com/svc/store"], "var _ = store.X")?;
  m.write_go("store/store.go", "store", &[], "var X = 1")?;
  let base = m.commit("service")?;

  m.write_go("store/store.go", "store", &[], "var X = 2")?;
  std::fs::write(m.repo.join("README.md"), "outside the module\n")?;
  m.commit("change store")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/svc/api", "example.com/svc/store"]);
  Ok(())
}

#[test]
fn test_all_files_flag() -> Result<()> {
  let (m, _base) = layered_module()?;
  m.write("pkg/b/testdata/fixture.json", "{}\n")?;
  let with_fixture = m.commit("fixture")?;

  m.write("pkg/b/testdata/fixture.json", "{\"changed\": true}\n")?;
  m.commit("change fixture")?;

  assert!(m.affected_since(&with_fixture)?.is_empty());

  let path = m.path.display().to_string();
  let output = run_patrol(&m.path, &["--from", &with_fixture, "--all-files", &path])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let lines: Vec<&str> = stdout.lines().collect();
  assert_eq!(lines, vec!["example.com/m", "example.com/m/pkg/a", "example.com/m/pkg/b"]);
  Ok(())
}

#[test]
fn test_all_files_from_config() -> Result<()> {
  let (m, _base) = layered_module()?;
  m.write(".patrol.toml", "[changes]\nall_files = true\n")?;
  let base = m.commit("config")?;

  m.write("pkg/c/schema.sql", "create table t();\n")?;
  m.commit("schema")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/c"]);
  Ok(())
}

#[test]
fn test_ignored_dirs_from_config() -> Result<()> {
  let m = TestModule::new(MODULE)?;
  m.write_go("pkg/a/a.go", "a", &[], "var A = 1")?;
  m.write("pkg/a/testdata/broken.go", "this is not go\n")?;
  m.write("patrol.toml", "[scan]\nignore_dirs = [\"testdata\"]\n")?;
  let base = m.commit("module with fixtures")?;

  m.write_go("pkg/a/a.go", "a", &[], "var A = 2")?;
  m.commit("change a")?;

  assert_eq!(m.affected_since(&base)?, vec!["example.com/m/pkg/a"]);
  Ok(())
}
