//! luadts: TypeScript declarations for derive-style Lua class hierarchies.
//!
//! The analysis lives in the workspace crates; this crate is the command-line
//! front door around them.
//!
//! - [`luadts_core`]: configuration, file discovery, naming
//! - [`luadts_lua`]: Lua analysis, overlays and emission
//! - [`cli`]: the `generate`, `populate` and `order` commands
//! - [`output`]: JSON responses and output writers
//! - [`error`]: the unified error type and exit codes

pub use luadts_core::config;
pub use luadts_lua::{GeneratedOutput, Library, ParseReport};

pub mod cli;
pub mod error;
pub mod output;

// Error bridges - converts per-crate errors to LuadtsError
mod error_bridges;
