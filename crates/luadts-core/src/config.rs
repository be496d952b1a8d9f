//! Generator configuration.
//!
//! Configuration is read from an optional JSON file. Every key is optional;
//! absent keys take the defaults below, unknown keys are ignored.
//!
//! ```json
//! {
//!   "moduleName": "@luadts/lua",
//!   "rootNamespace": "lua",
//!   "rootClass": "ISBaseObject",
//!   "subtrees": ["client", "shared", "server"],
//!   "exclude": ["**/tests/**"]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::is_identifier;

/// Default iteration cap for dependency ordering, per source unit.
pub const DEFAULT_ORDER_ITERATIONS_PER_UNIT: usize = 4;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`GeneratorConfig`].
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid config value for '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by scanning, analysis and emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Name used in the `declare module '<name>'` wrapper.
    pub module_name: String,
    /// Namespace holding every class and table declaration.
    pub root_namespace: String,
    /// Name of the synthetic root class every hierarchy derives from.
    pub root_class: String,
    /// Top-level source directories that are scanned.
    ///
    /// Empty means the whole source root.
    pub subtrees: Vec<String>,
    /// Glob patterns (relative to the source root) excluded from scanning.
    pub exclude: Vec<String>,
    /// Explicit iteration cap for dependency ordering.
    pub max_order_iterations: Option<usize>,
    /// File name of the aggregated reference index.
    pub reference_file: String,
    /// File name of the Lua runtime binding shim.
    pub bindings_file: String,
    /// File name of the curated public API partial.
    pub api_file: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            module_name: "@luadts/lua".to_string(),
            root_namespace: "lua".to_string(),
            root_class: "ISBaseObject".to_string(),
            subtrees: vec![
                "client".to_string(),
                "shared".to_string(),
                "server".to_string(),
            ],
            exclude: Vec::new(),
            max_order_iterations: None,
            reference_file: "reference.d.ts".to_string(),
            bindings_file: "bindings.lua".to_string(),
            api_file: "api.d.ts".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str, origin: &str) -> ConfigResult<Self> {
        let config: GeneratorConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Json {
                path: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text, &path.display().to_string())
    }

    /// Check that every value can be used to generate valid output.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.module_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "moduleName",
                message: "must not be empty".to_string(),
            });
        }
        if !self.root_namespace.split('.').all(is_identifier) {
            return Err(ConfigError::InvalidValue {
                key: "rootNamespace",
                message: format!("'{}' is not a dotted identifier", self.root_namespace),
            });
        }
        if !is_identifier(&self.root_class) {
            return Err(ConfigError::InvalidValue {
                key: "rootClass",
                message: format!("'{}' is not an identifier", self.root_class),
            });
        }
        let outputs = [
            ("referenceFile", &self.reference_file),
            ("bindingsFile", &self.bindings_file),
            ("apiFile", &self.api_file),
        ];
        for (key, value) in outputs {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: "must not be empty".to_string(),
                });
            }
        }
        if self.reference_file == self.bindings_file
            || self.reference_file == self.api_file
            || self.bindings_file == self.api_file
        {
            return Err(ConfigError::InvalidValue {
                key: "apiFile",
                message: "output file names must be distinct".to_string(),
            });
        }
        if self.max_order_iterations == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "maxOrderIterations",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Iteration cap for ordering `unit_count` units.
    pub fn order_iteration_cap(&self, unit_count: usize) -> usize {
        self.max_order_iterations
            .unwrap_or_else(|| unit_count.max(1) * DEFAULT_ORDER_ITERATIONS_PER_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        GeneratorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = GeneratorConfig::from_json_str(r#"{"rootClass": "Base"}"#, "inline").unwrap();
        assert_eq!(config.root_class, "Base");
        assert_eq!(config.root_namespace, "lua");
        assert_eq!(config.subtrees.len(), 3);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config =
            GeneratorConfig::from_json_str(r#"{"somethingElse": true}"#, "inline").unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let err = GeneratorConfig::from_json_str(r#"{"rootNamespace": "a..b"}"#, "inline")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "rootNamespace",
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_output_names_rejected() {
        let err = GeneratorConfig::from_json_str(
            r#"{"apiFile": "out.d.ts", "referenceFile": "out.d.ts"}"#,
            "inline",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_json_reports_origin() {
        let err = GeneratorConfig::from_json_str("{", "luadts.json").unwrap_err();
        assert!(err.to_string().contains("luadts.json"));
    }

    #[test]
    fn test_order_iteration_cap() {
        let mut config = GeneratorConfig::default();
        assert_eq!(config.order_iteration_cap(10), 40);
        assert_eq!(config.order_iteration_cap(0), 4);
        config.max_order_iterations = Some(7);
        assert_eq!(config.order_iteration_cap(10), 7);
    }
}
