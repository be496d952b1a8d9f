//! Overlay document types.
//!
//! An overlay document refines what the scanner inferred for one source
//! file. Every node is optional in JSON: missing keys deserialize to
//! defaults, and [`ModelDocument::pruned`] drops nodes that carry nothing
//! beyond defaults, so saving an untouched document writes nothing.
//!
//! ```json
//! {
//!   "version": 1,
//!   "classes": {
//!     "ISButton": {
//!       "documentation": { "description": ["A clickable button."] },
//!       "methods": {
//!         "setTitle": {
//!           "parameters": [{ "id": "title", "types": ["string"] }],
//!           "_return_": { "types": ["void"], "wrapWildcardType": false }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current document format version.
pub const MODEL_VERSION: u32 = 1;

fn default_version() -> u32 {
    MODEL_VERSION
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

// ============================================================================
// Leaf nodes
// ============================================================================

/// Free-text documentation attached to any node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Documentation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
}

impl Documentation {
    pub fn is_default(&self) -> bool {
        self.description.is_empty() && self.authors.is_empty()
    }
}

/// A field (static, instance or global).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldModel {
    #[serde(skip_serializing_if = "Documentation::is_default")]
    pub documentation: Documentation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl FieldModel {
    pub fn is_default(&self) -> bool {
        self.documentation.is_default() && self.types.is_empty()
    }
}

/// One parameter of a callable, identified by its normalized id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamModel {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Documentation::is_default")]
    pub documentation: Documentation,
}

impl ParamModel {
    pub fn new(id: impl Into<String>) -> Self {
        ParamModel {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self.rename.is_none() && self.types.is_empty() && self.documentation.is_default()
    }
}

/// Return information of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReturnModel {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Render the callable as `((..) => T) | unknown` instead of a plain
    /// function type.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub wrap_wildcard_type: bool,
}

impl Default for ReturnModel {
    fn default() -> Self {
        ReturnModel {
            types: Vec::new(),
            description: String::new(),
            wrap_wildcard_type: true,
        }
    }
}

impl ReturnModel {
    pub fn is_default(&self) -> bool {
        self.types.is_empty() && self.description.is_empty() && self.wrap_wildcard_type
    }
}

// ============================================================================
// Callables
// ============================================================================

/// A method, constructor or free function.
///
/// Parameters are kept in full whenever the node is kept at all: the ordered
/// id list is what [`crate::overlay::test_signature`] compares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallableModel {
    #[serde(skip_serializing_if = "Documentation::is_default")]
    pub documentation: Documentation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParamModel>,
    #[serde(rename = "_return_", skip_serializing_if = "ReturnModel::is_default")]
    pub returns: ReturnModel,
}

pub type MethodModel = CallableModel;
pub type ConstructorModel = CallableModel;
pub type FunctionModel = CallableModel;

impl CallableModel {
    /// A default node for the given parameter ids.
    pub fn for_params<S: AsRef<str>>(params: &[S]) -> Self {
        CallableModel {
            parameters: params.iter().map(|id| ParamModel::new(id.as_ref())).collect(),
            ..Default::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self.documentation.is_default()
            && self.returns.is_default()
            && self.parameters.iter().all(ParamModel::is_default)
    }
}

// ============================================================================
// Containers
// ============================================================================

/// Overlay for a class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassModel {
    #[serde(skip_serializing_if = "Documentation::is_default")]
    pub documentation: Documentation,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldModel>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, MethodModel>,
    #[serde(rename = "_constructor_", skip_serializing_if = "Option::is_none")]
    pub constructor: Option<ConstructorModel>,
}

/// Overlay for a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableModel {
    #[serde(skip_serializing_if = "Documentation::is_default")]
    pub documentation: Documentation,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldModel>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, MethodModel>,
}

/// Shared read access to class and table overlays.
pub trait ContainerModel {
    fn documentation(&self) -> &Documentation;
    fn fields(&self) -> &BTreeMap<String, FieldModel>;
    fn methods(&self) -> &BTreeMap<String, MethodModel>;
    fn constructor(&self) -> Option<&ConstructorModel> {
        None
    }
}

impl ContainerModel for ClassModel {
    fn documentation(&self) -> &Documentation {
        &self.documentation
    }
    fn fields(&self) -> &BTreeMap<String, FieldModel> {
        &self.fields
    }
    fn methods(&self) -> &BTreeMap<String, MethodModel> {
        &self.methods
    }
    fn constructor(&self) -> Option<&ConstructorModel> {
        self.constructor.as_ref()
    }
}

impl ContainerModel for TableModel {
    fn documentation(&self) -> &Documentation {
        &self.documentation
    }
    fn fields(&self) -> &BTreeMap<String, FieldModel> {
        &self.fields
    }
    fn methods(&self) -> &BTreeMap<String, MethodModel> {
        &self.methods
    }
}

impl ClassModel {
    fn pruned(&self) -> Self {
        ClassModel {
            documentation: self.documentation.clone(),
            fields: prune_map(&self.fields, FieldModel::is_default),
            methods: prune_map(&self.methods, CallableModel::is_default),
            constructor: self.constructor.clone().filter(|c| !c.is_default()),
        }
    }

    /// True when nothing in the node deviates from defaults.
    pub fn is_default(&self) -> bool {
        self.documentation.is_default()
            && self.fields.values().all(FieldModel::is_default)
            && self.methods.values().all(CallableModel::is_default)
            && self.constructor.as_ref().is_none_or(CallableModel::is_default)
    }

    /// Add default nodes from `generated` that are missing here.
    pub fn fill_from(&mut self, generated: ClassModel) {
        fill_map(&mut self.fields, generated.fields);
        fill_map(&mut self.methods, generated.methods);
        if self.constructor.is_none() {
            self.constructor = generated.constructor;
        }
    }
}

impl TableModel {
    fn pruned(&self) -> Self {
        TableModel {
            documentation: self.documentation.clone(),
            fields: prune_map(&self.fields, FieldModel::is_default),
            methods: prune_map(&self.methods, CallableModel::is_default),
        }
    }

    pub fn is_default(&self) -> bool {
        self.documentation.is_default()
            && self.fields.values().all(FieldModel::is_default)
            && self.methods.values().all(CallableModel::is_default)
    }

    pub fn fill_from(&mut self, generated: TableModel) {
        fill_map(&mut self.fields, generated.fields);
        fill_map(&mut self.methods, generated.methods);
    }
}

// ============================================================================
// Document
// ============================================================================

/// One overlay document, covering one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub classes: BTreeMap<String, ClassModel>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, TableModel>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub global_fields: BTreeMap<String, FieldModel>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub global_functions: BTreeMap<String, FunctionModel>,
}

impl Default for ModelDocument {
    fn default() -> Self {
        ModelDocument {
            version: MODEL_VERSION,
            classes: BTreeMap::new(),
            tables: BTreeMap::new(),
            global_fields: BTreeMap::new(),
            global_functions: BTreeMap::new(),
        }
    }
}

impl ModelDocument {
    /// A copy with every default node removed.
    pub fn pruned(&self) -> Self {
        ModelDocument {
            version: self.version,
            classes: self
                .classes
                .iter()
                .filter(|(_, node)| !node.is_default())
                .map(|(name, node)| (name.clone(), node.pruned()))
                .collect(),
            tables: self
                .tables
                .iter()
                .filter(|(_, node)| !node.is_default())
                .map(|(name, node)| (name.clone(), node.pruned()))
                .collect(),
            global_fields: prune_map(&self.global_fields, FieldModel::is_default),
            global_functions: prune_map(&self.global_functions, CallableModel::is_default),
        }
    }

    /// True when the document holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.tables.is_empty()
            && self.global_fields.is_empty()
            && self.global_functions.is_empty()
    }

    /// Add default nodes from `generated` that are missing here. Existing
    /// nodes are never overwritten.
    pub fn fill_from(&mut self, generated: ModelDocument) {
        for (name, node) in generated.classes {
            self.classes.entry(name).or_default().fill_from(node);
        }
        for (name, node) in generated.tables {
            self.tables.entry(name).or_default().fill_from(node);
        }
        fill_map(&mut self.global_fields, generated.global_fields);
        fill_map(&mut self.global_functions, generated.global_functions);
    }
}

fn prune_map<T: Clone>(map: &BTreeMap<String, T>, is_default: fn(&T) -> bool) -> BTreeMap<String, T> {
    map.iter()
        .filter(|(_, node)| !is_default(node))
        .map(|(name, node)| (name.clone(), node.clone()))
        .collect()
}

fn fill_map<T>(target: &mut BTreeMap<String, T>, generated: BTreeMap<String, T>) {
    for (name, node) in generated {
        target.entry(name).or_insert(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_default() {
        let doc: ModelDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, ModelDocument::default());
        let ret: ReturnModel = serde_json::from_str("{}").unwrap();
        assert!(ret.wrap_wildcard_type);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let doc: ModelDocument =
            serde_json::from_str(r#"{"version": 1, "editor": {"x": 1}, "classes": {}}"#).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_default_nodes_serialize_empty() {
        let callable = CallableModel::for_params(&["a", "b"]);
        assert!(callable.is_default());
        let mut doc = ModelDocument::default();
        doc.global_functions.insert("f".into(), callable);
        assert!(doc.pruned().is_empty());
    }

    #[test]
    fn test_non_default_callable_keeps_all_params() {
        let mut callable = CallableModel::for_params(&["a", "b"]);
        callable.parameters[1].types = vec!["number".into()];
        let mut doc = ModelDocument::default();
        doc.global_functions.insert("f".into(), callable);
        let pruned = doc.pruned();
        assert_eq!(pruned.global_functions["f"].parameters.len(), 2);
    }

    #[test]
    fn test_wrap_flag_serialized_only_when_false() {
        let mut callable = CallableModel::default();
        assert_eq!(serde_json::to_string(&callable).unwrap(), "{}");
        callable.returns.wrap_wildcard_type = false;
        assert_eq!(
            serde_json::to_string(&callable).unwrap(),
            r#"{"_return_":{"wrapWildcardType":false}}"#
        );
    }

    #[test]
    fn test_fill_never_overwrites() {
        let mut doc = ModelDocument::default();
        let mut existing = FieldModel::default();
        existing.types.push("string".into());
        doc.global_fields.insert("x".into(), existing.clone());

        let mut generated = ModelDocument::default();
        generated.global_fields.insert("x".into(), FieldModel::default());
        generated.global_fields.insert("y".into(), FieldModel::default());
        doc.fill_from(generated);

        assert_eq!(doc.global_fields["x"], existing);
        assert!(doc.global_fields.contains_key("y"));
    }

    #[test]
    fn test_class_constructor_key() {
        let json = r#"{"_constructor_": {"parameters": [{"id": "x"}]}}"#;
        let class: ClassModel = serde_json::from_str(json).unwrap();
        assert_eq!(class.constructor.unwrap().parameters[0].id, "x");
    }
}
