//! CLI front door.
//!
//! Provides the helpers behind each `luadts` subcommand:
//! - `generate` - analyze a source tree and write every output surface
//! - `populate` - add default overlay nodes for every inferred entity
//! - `order` - print the units in dependency order
//!
//! The binary parses flags, builds a [`GeneratorConfig`] with
//! [`load_config`], and calls one of the `run_*` functions. Each returns a
//! serializable response or a [`LuadtsError`] with a stable exit code.

use std::path::{Path, PathBuf};

use luadts_core::config::GeneratorConfig;
use luadts_lua::Library;

use crate::error::LuadtsError;
use crate::output::{
    write_generated, GenerateResponse, OrderResponse, PopulateResponse, SCHEMA_VERSION,
};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration values given on the command line. Each one that is set
/// replaces the value from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub module_name: Option<String>,
    pub root_namespace: Option<String>,
    pub root_class: Option<String>,
    pub subtrees: Vec<String>,
    pub exclude: Vec<String>,
    pub max_order_iterations: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(module_name) = &self.module_name {
            config.module_name = module_name.clone();
        }
        if let Some(root_namespace) = &self.root_namespace {
            config.root_namespace = root_namespace.clone();
        }
        if let Some(root_class) = &self.root_class {
            config.root_class = root_class.clone();
        }
        if !self.subtrees.is_empty() {
            config.subtrees = self.subtrees.clone();
        }
        // exclusions add up
        config.exclude.extend(self.exclude.iter().cloned());
        if self.max_order_iterations.is_some() {
            config.max_order_iterations = self.max_order_iterations;
        }
    }
}

/// Load the configuration file (defaults when `path` is `None`), apply the
/// overrides and validate the result.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<GeneratorConfig, LuadtsError> {
    let mut config = match path {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

fn open_library(
    config: GeneratorConfig,
    source: &Path,
    models: Option<&Path>,
) -> Result<Library, LuadtsError> {
    if !source.is_dir() {
        return Err(LuadtsError::file_not_found(source.display().to_string()));
    }
    let mut lib = Library::new(config)?;
    lib.load_sources(source)?;
    if let Some(models) = models {
        lib.load_models(models)?;
    }
    lib.parse();
    Ok(lib)
}

/// Analyze `source` and write every output surface below `out`.
pub fn run_generate(
    config: GeneratorConfig,
    source: &Path,
    models: Option<&Path>,
    out: &Path,
) -> Result<GenerateResponse, LuadtsError> {
    let lib = open_library(config, source, models)?;
    let output = lib.generate();
    let files = write_generated(out, &output, lib.config())?;
    Ok(GenerateResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        output_dir: out.display().to_string(),
        files,
        report: lib.report().clone(),
    })
}

/// Add default overlay nodes for everything inferred from `source` and save
/// the models to `models` in minimal form.
pub fn run_populate(
    config: GeneratorConfig,
    source: &Path,
    models: &Path,
) -> Result<PopulateResponse, LuadtsError> {
    let mut lib = open_library(config, source, Some(models))?;
    let populated = lib.populate_models();
    let saved = lib.save_models(models)?;
    Ok(PopulateResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        models_dir: models.display().to_string(),
        populated,
        written: saved.written,
        removed: saved.removed,
        report: lib.report().clone(),
    })
}

/// Order the units below `source` so each follows what it requires.
pub fn run_order(config: GeneratorConfig, source: &Path) -> Result<OrderResponse, LuadtsError> {
    let lib = open_library(config, source, None)?;
    let order = lib.dependency_order()?;
    Ok(OrderResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        order: order.order,
        iterations: order.iterations,
        report: lib.report().clone(),
    })
}

/// Default output directory: `<source>/../luadts-out`, or `luadts-out` when
/// the source has no parent.
pub fn default_out_dir(source: &Path) -> PathBuf {
    source
        .parent()
        .map(|parent| parent.join("luadts-out"))
        .unwrap_or_else(|| PathBuf::from("luadts-out"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_apply() {
        let mut config = GeneratorConfig {
            exclude: vec!["a/**".to_string()],
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            module_name: Some("@game/lua".to_string()),
            subtrees: vec!["shared".to_string()],
            exclude: vec!["b/**".to_string()],
            ..Default::default()
        };
        overrides.apply(&mut config);
        assert_eq!(config.module_name, "@game/lua");
        assert_eq!(config.root_class, "ISBaseObject");
        assert_eq!(config.subtrees, vec!["shared"]);
        assert_eq!(config.exclude, vec!["a/**", "b/**"]);
    }

    #[test]
    fn test_load_config_file_and_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("luadts.json");
        std::fs::write(&path, r#"{ "rootClass": "Base", "unknownKey": 1 }"#).unwrap();
        let config = load_config(Some(&path), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.root_class, "Base");

        let bad = ConfigOverrides {
            root_namespace: Some("not valid".to_string()),
            ..Default::default()
        };
        let err = load_config(Some(&path), &bad).unwrap_err();
        assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);

        let missing = dir.path().join("missing.json");
        let err = load_config(Some(&missing), &ConfigOverrides::default()).unwrap_err();
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
    }

    #[test]
    fn test_missing_source_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        let err = run_order(GeneratorConfig::default(), &dir.path().join("nope")).unwrap_err();
        assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
    }

    #[test]
    fn test_default_out_dir() {
        assert_eq!(
            default_out_dir(Path::new("/game/lua")),
            PathBuf::from("/game/luadts-out")
        );
    }
}
