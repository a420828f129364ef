//! Go module collaborators: the go.mod reader and the imports-only source reader.

pub mod imports;
pub mod modfile;

pub use modfile::ModFile;
