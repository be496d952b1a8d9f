//! JSON responses and output writers for the CLI.
//!
//! Every command prints exactly one JSON document on stdout. Successful
//! responses carry `"status": "ok"`, failures use [`ErrorResponse`] with
//! the numeric code from [`OutputErrorCode`].

use std::io::{self, Write};
use std::path::Path;

use luadts_core::config::GeneratorConfig;
use luadts_core::files::{write_relative, FileResult};
use luadts_lua::{GeneratedOutput, ParseReport};
use serde::Serialize;

use crate::error::{LuadtsError, OutputErrorCode};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Responses
// ============================================================================

/// Response of `luadts generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub status: String,
    pub schema_version: String,
    pub output_dir: String,
    /// Written files, relative to `output_dir`.
    pub files: Vec<String>,
    pub report: ParseReport,
}

/// Response of `luadts populate`.
#[derive(Debug, Clone, Serialize)]
pub struct PopulateResponse {
    pub status: String,
    pub schema_version: String,
    pub models_dir: String,
    /// Documents that gained default nodes.
    pub populated: usize,
    /// Model files written, relative to `models_dir`.
    pub written: Vec<String>,
    /// Stale model files removed, relative to `models_dir`.
    pub removed: Vec<String>,
    pub report: ParseReport,
}

/// Response of `luadts order`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub status: String,
    pub schema_version: String,
    /// Unit ids, dependencies first.
    pub order: Vec<String>,
    pub iterations: usize,
    pub report: ParseReport,
}

/// Error information in an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &LuadtsError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &LuadtsError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Writers
// ============================================================================

/// Write every generated file below `out_dir`. Returns the relative paths
/// written, in write order.
pub fn write_generated(
    out_dir: &Path,
    output: &GeneratedOutput,
    config: &GeneratorConfig,
) -> FileResult<Vec<String>> {
    let mut written = Vec::new();
    for (path, text) in output.files(config) {
        write_relative(out_dir, path, text)?;
        written.push(path.to_string());
    }
    tracing::info!("wrote {} files to {}", written.len(), out_dir.display());
    Ok(written)
}
