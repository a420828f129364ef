//! CLI commands for patrol
//!
//! - **affected**: Find module packages affected by the changes since a revision
//!
//! Commands accept `&ModuleContext` so go.mod and config are loaded once.

pub mod affected;

pub use affected::{OutputFormat, run_affected};
