//! Error types and error code constants for luadts.
//!
//! `LuadtsError` is the single error type the CLI renders. Errors from the
//! analysis crates are bridged into it in [`crate::error_bridges`].
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad flags, bad configuration, malformed model)
//! - `3`: Resolution errors (source root missing, require cycle)
//! - `4`: Apply errors (failed to write output or models)
//! - `10`: Internal errors

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes. They are the CLI exit codes and appear in JSON error
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or configuration from the caller.
    InvalidArguments = 2,
    /// Something named by the caller could not be found or resolved.
    ResolutionError = 3,
    /// Output could not be written.
    ApplyError = 4,
    /// Bugs and unexpected state.
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum LuadtsError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Invalid generator configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An overlay model document could not be used.
    #[error("invalid model: {message}")]
    InvalidModel {
        message: String,
        path: Option<String>,
    },

    /// File or directory not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Dependency ordering did not settle.
    #[error("require cycle: ordering did not settle within {limit} sweeps")]
    DependencyCycle { limit: usize, units: Vec<String> },

    /// Failed to write output.
    #[error("write error: {message}")]
    WriteError {
        message: String,
        path: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&LuadtsError> for OutputErrorCode {
    fn from(err: &LuadtsError) -> Self {
        match err {
            LuadtsError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            LuadtsError::InvalidConfig { .. } => OutputErrorCode::InvalidArguments,
            LuadtsError::InvalidModel { .. } => OutputErrorCode::InvalidArguments,
            LuadtsError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            LuadtsError::DependencyCycle { .. } => OutputErrorCode::ResolutionError,
            LuadtsError::WriteError { .. } => OutputErrorCode::ApplyError,
            LuadtsError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<LuadtsError> for OutputErrorCode {
    fn from(err: LuadtsError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl LuadtsError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        LuadtsError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        LuadtsError::FileNotFound { path: path.into() }
    }

    pub fn write_error(message: impl Into<String>, path: Option<String>) -> Self {
        LuadtsError::WriteError {
            message: message.into(),
            path,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        LuadtsError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }

    /// Structured data for the JSON error envelope.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            LuadtsError::InvalidArguments { details, .. } => details.clone(),
            LuadtsError::InvalidModel { path, .. } | LuadtsError::WriteError { path, .. } => {
                path.as_ref().map(|path| serde_json::json!({ "path": path }))
            }
            LuadtsError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            LuadtsError::DependencyCycle { limit, units } => {
                Some(serde_json::json!({ "limit": limit, "units": units }))
            }
            LuadtsError::InvalidConfig { .. } | LuadtsError::InternalError { .. } => None,
        }
    }
}
