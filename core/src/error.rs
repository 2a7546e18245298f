//! Error types.
//!
//! [`ModelError`] means the schema definitions themselves are broken. It is
//! raised while the model is being built and the caller is expected to abort
//! startup. [`InvalidData`] means an entity failed validation against a
//! sound schema, and is recoverable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model-definition errors, raised during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Two definitions share a schema name.
    #[error("duplicate schema: {0}")]
    DuplicateSchema(String),
    /// A schema was looked up that was never added.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),
    /// An `extends` entry names a schema that does not exist.
    #[error("schema {schema} extends missing schema: {parent}")]
    MissingParent { schema: String, parent: String },
    /// The `extends` graph loops back on itself.
    #[error("inheritance cycle: {0}")]
    InheritanceCycle(String),
    #[error("missing featured property: {schema}:{property}")]
    MissingFeatured { schema: String, property: String },
    #[error("missing caption property: {schema}:{property}")]
    MissingCaption { schema: String, property: String },
    #[error("missing required property: {schema}:{property}")]
    MissingRequired { schema: String, property: String },
    #[error("missing edge source: {schema}:{property}")]
    MissingEdgeSource { schema: String, property: String },
    #[error("missing edge target: {schema}:{property}")]
    MissingEdgeTarget { schema: String, property: String },
    /// A reverse-link declaration without a name. Carries the qualified
    /// name of the declaring property.
    #[error("unnamed reverse: {0}")]
    UnnamedReverse(String),
    #[error("unknown property type {type_name} on {property}")]
    UnknownPropertyType { property: String, type_name: String },
    /// A property's `range` names a schema that does not exist.
    #[error("property {property} has missing range: {range}")]
    MissingRange { property: String, range: String },
}

/// Per-property validation messages.
///
/// Serializes as `{"properties": {"<name>": "<message>"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMap {
    pub properties: BTreeMap<String, String>,
}

impl ErrorMap {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// An entity failed validation against its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvalidData {
    /// Summary message, already translated.
    pub message: String,
    pub errors: ErrorMap,
}

/// Convenience alias for results with [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_map_shape() {
        let mut errors = ErrorMap::default();
        errors
            .properties
            .insert("name".to_string(), "Required".to_string());
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"properties": {"name": "Required"}})
        );
    }

    #[test]
    fn test_model_error_messages() {
        let err = ModelError::MissingFeatured {
            schema: "Person".into(),
            property: "nationality".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing featured property: Person:nationality"
        );
        assert_eq!(
            ModelError::InheritanceCycle("A -> B -> A".into()).to_string(),
            "inheritance cycle: A -> B -> A"
        );
    }
}
