//! Error types for patrol with contextual messages and exit codes
//!
//! Every failure inside the analysis is fatal: an incomplete graph could silently
//! under-report affected packages. Errors bubble up unmodified (apart from added
//! context) and only `main` prints them and picks the exit status.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for patrol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing or malformed go.mod)
  User = 1,
  /// System error (git, I/O, unparseable sources)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for patrol
#[derive(Debug)]
pub enum PatrolError {
  /// Configuration errors (go.mod, patrol.toml, arguments)
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Source scanning errors
  Scan(ScanError),

  /// I/O errors
  Io(io::Error),

  /// I/O error with a description of what was being done
  IoContext { context: String, source: io::Error },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl PatrolError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    PatrolError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    PatrolError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      PatrolError::Message { message, context, help } => PatrolError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      PatrolError::Io(source) => PatrolError::IoContext {
        context: ctx_str,
        source,
      },
      PatrolError::IoContext { context, source } => PatrolError::IoContext {
        context: format!("{}: {}", ctx_str, context),
        source,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PatrolError::Config(_) => ExitCode::User,
      PatrolError::Git(_) => ExitCode::System,
      PatrolError::Scan(_) => ExitCode::System,
      PatrolError::Io(_) | PatrolError::IoContext { .. } => ExitCode::System,
      PatrolError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      PatrolError::Config(e) => e.help_message(),
      PatrolError::Git(e) => e.help_message(),
      PatrolError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for PatrolError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PatrolError::Config(e) => write!(f, "{}", e),
      PatrolError::Git(e) => write!(f, "{}", e),
      PatrolError::Scan(e) => write!(f, "{}", e),
      PatrolError::Io(e) => write!(f, "I/O error: {}", e),
      PatrolError::IoContext { context, source } => write!(f, "{}: {}", context, source),
      PatrolError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for PatrolError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PatrolError::Io(e) | PatrolError::IoContext { source: e, .. } => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for PatrolError {
  fn from(err: io::Error) -> Self {
    PatrolError::Io(err)
  }
}

impl From<String> for PatrolError {
  fn from(msg: String) -> Self {
    PatrolError::message(msg)
  }
}

impl From<&str> for PatrolError {
  fn from(msg: &str) -> Self {
    PatrolError::message(msg)
  }
}

impl From<ConfigError> for PatrolError {
  fn from(err: ConfigError) -> Self {
    PatrolError::Config(err)
  }
}

impl From<GitError> for PatrolError {
  fn from(err: GitError) -> Self {
    PatrolError::Git(err)
  }
}

impl From<ScanError> for PatrolError {
  fn from(err: ScanError) -> Self {
    PatrolError::Scan(err)
  }
}

impl From<serde_json::Error> for PatrolError {
  fn from(err: serde_json::Error) -> Self {
    PatrolError::message(format!("JSON error: {}", err))
  }
}

impl From<walkdir::Error> for PatrolError {
  fn from(err: walkdir::Error) -> Self {
    let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
    PatrolError::IoContext {
      context: format!("Failed to walk directory {}", path),
      source: io::Error::from(err),
    }
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// go.mod not found at the module root
  ModFileNotFound { module_dir: PathBuf },

  /// go.mod could not be parsed
  ModFileInvalid { file: String, line: usize, reason: String },

  /// patrol.toml could not be read or deserialized
  ConfigFileInvalid { path: PathBuf, reason: String },

  /// Missing required argument
  MissingArgument { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::ModFileNotFound { .. } => {
        Some("Point patrol at the directory that contains the module's go.mod file.".to_string())
      }
      ConfigError::MissingArgument { name } if name == "from" => {
        Some("Pass the base revision, e.g.: patrol -from=a0e002f951f56d53d552f9427b3331b11ea66e92 .".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::ModFileNotFound { module_dir } => {
        write!(f, "No go.mod found in {}", module_dir.display())
      }
      ConfigError::ModFileInvalid { file, line, reason } => {
        write!(f, "{}:{}: {}", file, line, reason)
      }
      ConfigError::ConfigFileInvalid { path, reason } => {
        write!(f, "Invalid config file {}: {}", path.display(), reason)
      }
      ConfigError::MissingArgument { name } => {
        write!(f, "Missing required argument: {}", name)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Revision does not resolve to a tree
  RevisionNotFound { revision: String },

  /// File missing at a revision
  FileNotFound { revision: String, path: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run patrol inside a git checkout or check the path: {}",
        path.display()
      )),
      GitError::RevisionNotFound { .. } => {
        Some("In shallow CI clones, fetch enough history to include the base revision.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::RevisionNotFound { revision } => {
        write!(f, "Revision not found: {}", revision)
      }
      GitError::FileNotFound { revision, path } => {
        write!(f, "File {} does not exist at revision {}", path, revision)
      }
    }
  }
}

/// Source scanning errors
#[derive(Debug)]
pub enum ScanError {
  /// A Go source file could not be parsed for its imports
  Parse { file: PathBuf, reason: String },

  /// The Go grammar could not be loaded into the parser
  Grammar { reason: String },
}

impl fmt::Display for ScanError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScanError::Parse { file, reason } => {
        write!(f, "Failed to parse {}: {}", file.display(), reason)
      }
      ScanError::Grammar { reason } => {
        write!(f, "Failed to load the Go grammar: {}", reason)
      }
    }
  }
}

/// Result type alias for patrol
pub type PatrolResult<T> = Result<T, PatrolError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> PatrolResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> PatrolResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<PatrolError>,
{
  fn context(self, ctx: impl Into<String>) -> PatrolResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> PatrolResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Print an error to stderr with help text
pub fn print_error(error: &PatrolError) {
  eprintln!("error: {}", error);

  if let Some(help) = error.help_message() {
    eprintln!("help: {}", help);
  }
}
