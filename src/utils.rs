//! Argument helpers

use std::ffi::OsString;

/// Long flags that may also be written Go-style with a single dash.
const LONG_FLAGS: &[&str] = &["from", "all-files", "format", "config", "verbose", "help", "version"];

/// Rewrite Go-style single-dash long flags (`-from=abc`, `-from abc`) to the
/// double-dash form clap expects. Arguments after `--` are left alone.
pub fn normalize_go_style_flags<I>(args: I) -> Vec<OsString>
where
  I: IntoIterator<Item = OsString>,
{
  let mut out = Vec::new();
  let mut passthrough = false;

  for (idx, arg) in args.into_iter().enumerate() {
    if idx == 0 || passthrough {
      out.push(arg);
      continue;
    }

    let Some(text) = arg.to_str() else {
      out.push(arg);
      continue;
    };

    if text == "--" {
      passthrough = true;
      out.push(arg);
      continue;
    }

    let rewritten = match text.strip_prefix('-') {
      Some(rest) if !rest.starts_with('-') && is_long_flag(rest) => Some(format!("-{}", text)),
      _ => None,
    };
    out.push(rewritten.map(OsString::from).unwrap_or(arg));
  }

  out
}

fn is_long_flag(flag: &str) -> bool {
  let name = flag.split_once('=').map(|(name, _)| name).unwrap_or(flag);
  LONG_FLAGS.contains(&name)
}
