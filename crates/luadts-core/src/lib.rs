//! Core infrastructure for luadts.
//!
//! This crate provides language-agnostic infrastructure:
//! - Generator configuration
//! - Source and overlay file discovery
//! - Name sanitization for the TypeScript output surfaces
//! - Byte spans and text position utilities

pub mod config;
pub mod files;
pub mod naming;
pub mod span;
pub mod text;
