//! Lua pseudo-OOP analysis for luadts.
//!
//! This crate recognizes the `derive`-based class idiom over parsed Lua
//! sources and renders TypeScript declarations for it:
//!
//! - [`patterns`]: statement-level recognizers (require, derive, tables,
//!   proxies, functions, fields)
//! - [`unit`]: one source file and its three scan passes
//! - [`container`]: classes and tables with their members
//! - [`library`]: the registry, the pass driver, overlay lookups and output
//! - [`overlay`]: hand-authored JSON documentation and types
//! - [`emit`]: TypeScript rendering helpers
//! - [`order`]: dependency ordering by `require` edges

pub mod container;
pub mod emit;
pub mod library;
pub mod order;
pub mod overlay;
pub mod params;
pub mod patterns;
pub mod unit;

pub use container::{Container, ContainerKind, Signature};
pub use library::{
    FailedUnit, GeneratedOutput, Library, LibraryError, LibraryResult, ParseReport, Registry,
};
pub use order::{DependencyOrder, OrderError};
pub use overlay::{ModelDocument, ModelError, ModelStore};
pub use unit::SourceUnit;
