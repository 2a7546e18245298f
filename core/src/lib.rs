//! Declarative entity-type model with inheritance resolution.
//!
//! This crate defines the building blocks of an entity schema model:
//!
//! - [`Schema`] — a named entity or relationship type with typed properties,
//!   display metadata and an optional edge projection.
//! - [`Property`] — a typed attribute owned by one schema, optionally
//!   referencing another schema with a reverse link.
//! - [`PropertyType`] — the scalar value kinds a property can hold.
//! - [`ModelBuilder`] / [`Model`] — the registry. The builder resolves
//!   `extends` (multiple inheritance, first parent wins on conflicts),
//!   synthesizes reverse properties, checks consistency, and freezes into a
//!   read-only [`Model`].
//! - [`Graph`] — projects [`EntityRecord`]s into nodes and edges.
//!
//! Display text is resolved through an injected [`Translator`].
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use entity_schema_core::*;
//!
//! let definitions: BTreeMap<String, SchemaConfig> = serde_json::from_value(serde_json::json!({
//!     "Thing": {
//!         "abstract": true,
//!         "required": ["name"],
//!         "caption": ["name"],
//!         "properties": {"name": {"type": "name"}}
//!     },
//!     "LegalEntity": {"extends": "Thing", "properties": {"email": {"type": "email"}}},
//!     "Person": {"extends": "LegalEntity"}
//! })).unwrap();
//!
//! let mut builder = ModelBuilder::new(Arc::new(Identity));
//! builder.add_schemata(&definitions).unwrap();
//! let model = builder.build().unwrap();
//!
//! let person = model.get("Person").unwrap();
//! assert!(person.is_a("Thing"));
//! assert_eq!(person.properties().len(), 2);
//!
//! let err = person.validate(&serde_json::json!({"properties": {"email": "nope"}})).unwrap_err();
//! assert_eq!(err.errors.properties["name"], "Required");
//! assert_eq!(err.errors.properties["email"], "Invalid value");
//! ```

mod config;
mod error;
mod graph;
mod model;
mod property;
mod schema;
mod text;
mod types;

pub use config::{EdgeConfig, PropertyConfig, ReverseConfig, SchemaConfig};
pub use error::{ErrorMap, InvalidData, ModelError};
pub use graph::{Edge, EntityRecord, Graph, GraphDict, Node};
pub use model::{Model, ModelBuilder, ModelDict};
pub use property::{Property, PropertyDict};
pub use schema::{DEFAULT_NAMESPACE, EdgeDict, Schema, SchemaDict};
pub use text::{Catalog, Identity, Translator};
pub use types::{PropertyType, TypeDict};
