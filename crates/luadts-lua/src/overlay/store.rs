//! Loading and saving overlay documents.
//!
//! Documents live in a directory tree mirroring the source tree:
//! `client/ISUI/ISButton.lua` is refined by `client/ISUI/ISButton.json`.
//! A document that fails to read or parse is logged and skipped; the rest of
//! the directory still loads.

use std::collections::BTreeMap;
use std::path::Path;

use luadts_core::files::{remove_relative, write_relative};
use walkdir::WalkDir;

use super::model::ModelDocument;
use super::{ModelError, ModelResult};

/// Extension of overlay documents.
pub const MODEL_EXTENSION: &str = "json";

/// All overlay documents of a run, keyed by document id (the source path
/// without extension).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelStore {
    documents: BTreeMap<String, ModelDocument>,
    /// Documents that failed to load: (document id, message).
    skipped: Vec<(String, String)>,
}

/// What [`ModelStore::save_dir`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub written: Vec<String>,
    pub removed: Vec<String>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` document below `dir`.
    ///
    /// A missing directory yields an empty store.
    pub fn load_dir(dir: &Path) -> ModelResult<Self> {
        let mut store = ModelStore::new();
        if !dir.exists() {
            tracing::debug!("model directory {} does not exist", dir.display());
            return Ok(store);
        }
        if !dir.is_dir() {
            return Err(ModelError::NotADirectory {
                path: dir.display().to_string(),
            });
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable model entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().is_some_and(|ext| ext == MODEL_EXTENSION)
            {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();

        for path in paths {
            let Ok(rel) = path.strip_prefix(dir) else {
                continue;
            };
            let id = document_id(rel);
            match read_document(&path) {
                Ok(document) => {
                    store.documents.insert(id, document);
                }
                Err(e) => {
                    tracing::warn!("skipping model {}: {}", path.display(), e);
                    store.skipped.push((id, e.to_string()));
                }
            }
        }
        tracing::debug!(
            "loaded {} model documents ({} skipped)",
            store.documents.len(),
            store.skipped.len()
        );
        Ok(store)
    }

    /// Write every non-empty document below `dir` in minimal form.
    ///
    /// A document that prunes to nothing is not written, and a stale file for
    /// it is removed.
    pub fn save_dir(&self, dir: &Path) -> ModelResult<SaveReport> {
        let mut report = SaveReport::default();
        for (id, document) in &self.documents {
            let rel = format!("{}.{}", id, MODEL_EXTENSION);
            let pruned = document.pruned();
            if pruned.is_empty() {
                if dir.join(&rel).exists() {
                    remove_relative(dir, &rel)?;
                    report.removed.push(rel);
                }
                continue;
            }
            let mut text = serde_json::to_string_pretty(&pruned).map_err(|source| {
                ModelError::Serialize {
                    id: id.clone(),
                    source,
                }
            })?;
            text.push('\n');
            write_relative(dir, &rel, &text)?;
            report.written.push(rel);
        }
        Ok(report)
    }

    pub fn document(&self, id: &str) -> Option<&ModelDocument> {
        self.documents.get(id)
    }

    /// The document for `id`, created empty if missing.
    pub fn document_mut(&mut self, id: &str) -> &mut ModelDocument {
        self.documents.entry(id.to_string()).or_default()
    }

    pub fn insert(&mut self, id: impl Into<String>, document: ModelDocument) {
        self.documents.insert(id.into(), document);
    }

    pub fn documents(&self) -> impl Iterator<Item = (&str, &ModelDocument)> {
        self.documents.iter().map(|(id, doc)| (id.as_str(), doc))
    }

    pub fn skipped(&self) -> &[(String, String)] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn document_id(rel: &Path) -> String {
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    joined
        .strip_suffix(&format!(".{}", MODEL_EXTENSION))
        .map(str::to_string)
        .unwrap_or(joined)
}

fn read_document(path: &Path) -> ModelResult<ModelDocument> {
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::model::{FieldModel, ParamModel};

    #[test]
    fn test_document_id() {
        assert_eq!(
            document_id(Path::new("client/ISUI/ISButton.json")),
            "client/ISUI/ISButton"
        );
    }

    #[test]
    fn test_raw_underscored_keys_survive_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut doc = ModelDocument::default();
        for name in ["_end_", "_new_", "default"] {
            let mut field = FieldModel::default();
            field.types.push("number".into());
            doc.global_fields.insert(name.into(), field);
        }
        let mut store = ModelStore::new();
        store.insert("client/Keys", doc);
        store.save_dir(dir.path()).unwrap();

        let loaded = ModelStore::load_dir(dir.path()).unwrap();
        let reloaded = loaded.document("client/Keys").unwrap();
        let keys: Vec<&str> = reloaded.global_fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_end_", "_new_", "default"]);
    }

    #[test]
    fn test_param_model_roundtrip_shape() {
        let param = ParamModel {
            id: "a".into(),
            rename: Some("amount".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&param).unwrap(),
            r#"{"id":"a","rename":"amount"}"#
        );
    }
}
