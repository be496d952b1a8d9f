//! Hand-authored overlays layered onto inferred structure.
//!
//! Class, table and field nodes match by name. Callable nodes (methods,
//! constructors, free functions) additionally require their stored
//! parameter ids to equal the inferred ids position by position; see
//! [`test_signature`]. A mismatch means "no overlay" and the entity renders
//! with defaults.

pub mod model;
pub mod store;

pub use model::{
    CallableModel, ClassModel, ConstructorModel, ContainerModel, Documentation, FieldModel,
    FunctionModel, MethodModel, ModelDocument, ParamModel, ReturnModel, TableModel,
};
pub use store::{ModelStore, SaveReport};

use luadts_core::files::FileError;
use thiserror::Error;

use crate::container::Signature;

/// Errors from reading or writing overlay documents.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize model {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model path is not a directory: {path}")]
    NotADirectory { path: String },

    #[error(transparent)]
    File(#[from] FileError),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// True when `model` was authored for exactly this parameter list.
pub fn test_signature(model: &CallableModel, signature: &Signature) -> bool {
    model.parameters.len() == signature.params.len()
        && model
            .parameters
            .iter()
            .zip(&signature.params)
            .all(|(param, id)| param.id == *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(params: &[&str]) -> Signature {
        Signature {
            name: "bar".to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_signature_matches_in_order() {
        let model = CallableModel::for_params(&["a", "b"]);
        assert!(test_signature(&model, &signature(&["a", "b"])));
    }

    #[test]
    fn test_signature_rejects_reorder_and_arity() {
        let model = CallableModel::for_params(&["a", "b"]);
        assert!(!test_signature(&model, &signature(&["b", "a"])));
        assert!(!test_signature(&model, &signature(&["a", "b", "c"])));
        assert!(!test_signature(&model, &signature(&[])));
    }
}
