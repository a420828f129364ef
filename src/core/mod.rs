//! Core building blocks shared by the commands
//!
//! - **config**: patrol.toml parsing and validation
//! - **context**: module context built once in main and passed to commands
//! - **error**: error types with contextual help messages and exit codes
//! - **vcs**: git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
