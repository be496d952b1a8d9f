//! Error bridge implementations for the analysis crates.
//!
//! This module provides `impl From<X> for LuadtsError` conversions from the
//! per-crate error enums to the unified `LuadtsError` type.

use luadts_core::config::ConfigError;
use luadts_core::files::FileError;
use luadts_lua::{LibraryError, ModelError, OrderError};

use crate::error::LuadtsError;

// ============================================================================
// Bridge: FileError -> LuadtsError
// ============================================================================

impl From<FileError> for LuadtsError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound { path } => LuadtsError::FileNotFound { path },
            FileError::InvalidPattern { .. } => LuadtsError::InvalidConfig {
                message: err.to_string(),
            },
            // reads either surface as NotFound or are recorded per unit, so
            // an IO failure that propagates comes from writing
            FileError::Io { ref path, .. } => LuadtsError::WriteError {
                path: Some(path.clone()),
                message: err.to_string(),
            },
        }
    }
}

// ============================================================================
// Bridge: ConfigError -> LuadtsError
// ============================================================================

impl From<ConfigError> for LuadtsError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                LuadtsError::FileNotFound { path }
            }
            other => LuadtsError::InvalidConfig {
                message: other.to_string(),
            },
        }
    }
}

// ============================================================================
// Bridge: ModelError -> LuadtsError
// ============================================================================

impl From<ModelError> for LuadtsError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::File(file_err) => LuadtsError::from(file_err),
            ModelError::Serialize { .. } => LuadtsError::InternalError {
                message: err.to_string(),
            },
            ModelError::Io { ref path, .. }
            | ModelError::Json { ref path, .. }
            | ModelError::NotADirectory { ref path } => LuadtsError::InvalidModel {
                path: Some(path.clone()),
                message: err.to_string(),
            },
        }
    }
}

// ============================================================================
// Bridge: OrderError -> LuadtsError
// ============================================================================

impl From<OrderError> for LuadtsError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::CycleDetected { limit, units } => {
                LuadtsError::DependencyCycle { limit, units }
            }
        }
    }
}

// ============================================================================
// Bridge: LibraryError -> LuadtsError
// ============================================================================

impl From<LibraryError> for LuadtsError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::File(e) => LuadtsError::from(e),
            LibraryError::Config(e) => LuadtsError::from(e),
            LibraryError::Model(e) => LuadtsError::from(e),
            LibraryError::Order(e) => LuadtsError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputErrorCode;

    #[test]
    fn test_file_not_found_is_resolution() {
        let err = LuadtsError::from(FileError::NotFound {
            path: "src".into(),
        });
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
    }

    #[test]
    fn test_file_io_is_apply() {
        let err = LuadtsError::from(FileError::Io {
            path: "out/a.d.ts".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
        assert_eq!(err.details().unwrap()["path"], "out/a.d.ts");
    }

    #[test]
    fn test_config_errors() {
        let missing = ConfigError::Io {
            path: "luadts.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(
            LuadtsError::from(missing).error_code(),
            OutputErrorCode::ResolutionError
        );
        let invalid = ConfigError::InvalidValue {
            key: "rootClass",
            message: "bad".into(),
        };
        assert_eq!(
            LuadtsError::from(invalid).error_code(),
            OutputErrorCode::InvalidArguments
        );
    }

    #[test]
    fn test_cycle_through_library_error() {
        let err = LuadtsError::from(LibraryError::Order(OrderError::CycleDetected {
            limit: 8,
            units: vec!["client/A".into()],
        }));
        match err {
            LuadtsError::DependencyCycle { limit, units } => {
                assert_eq!(limit, 8);
                assert_eq!(units, vec!["client/A"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_model_not_a_directory() {
        let err = LuadtsError::from(ModelError::NotADirectory {
            path: "models.json".into(),
        });
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
    }
}
