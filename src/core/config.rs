use crate::core::error::{ConfigError, PatrolError, PatrolResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for patrol
/// Searched in order: patrol.toml, .patrol.toml, .config/patrol.toml
///
/// Every field is optional; a module without a config file gets the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatrolConfig {
  #[serde(default)]
  pub scan: ScanConfig,
  #[serde(default)]
  pub changes: ChangesConfig,
}

/// Directory scanning options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
  /// Directory names that are never scanned (".git" is always skipped)
  #[serde(default)]
  pub ignore_dirs: Vec<String>,
}

/// Change detection options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangesConfig {
  /// Map changes to non-Go files onto their enclosing package
  #[serde(default)]
  pub all_files: bool,
}

impl PatrolConfig {
  /// Find config file in search order: patrol.toml, .patrol.toml, .config/patrol.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("patrol.toml"),
      path.join(".patrol.toml"),
      path.join(".config").join("patrol.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config for a module.
  ///
  /// An explicit path must exist. Without one, the module root is searched and
  /// the defaults are used when nothing is found.
  pub fn load(module_root: &Path, explicit: Option<&Path>) -> PatrolResult<Self> {
    let config_path = match explicit {
      Some(path) => path.to_path_buf(),
      None => match Self::find_config_path(module_root) {
        Some(path) => path,
        None => {
          tracing::debug!(root = %module_root.display(), "no patrol config found, using defaults");
          return Ok(Self::default());
        }
      },
    };

    let invalid = |reason: String| {
      PatrolError::Config(ConfigError::ConfigFileInvalid {
        path: config_path.clone(),
        reason,
      })
    };

    let content = fs::read_to_string(&config_path).map_err(|e| invalid(e.to_string()))?;
    let config: PatrolConfig = toml_edit::de::from_str(&content).map_err(|e| invalid(e.to_string()))?;

    config.validate().map_err(invalid)?;

    tracing::debug!(path = %config_path.display(), "loaded patrol config");
    Ok(config)
  }

  fn validate(&self) -> Result<(), String> {
    for dir in &self.scan.ignore_dirs {
      if dir.is_empty() || dir.contains('/') || dir.contains('\\') {
        return Err(format!(
          "scan.ignore_dirs entries must be plain directory names, got '{}'",
          dir
        ));
      }
    }
    Ok(())
  }
}
