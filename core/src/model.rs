//! Schema registry and inheritance resolution.
//!
//! A [`ModelBuilder`] collects raw schema definitions, resolves them and
//! freezes the result into a read-only [`Model`]. Resolution
//! ([`ModelBuilder::generate`]) works on the whole registry at once because
//! it writes to more than one schema: a child copies its parents'
//! properties, ancestors learn about their descendants, and reverse links
//! add stub properties to the schemas they point at.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use entity_schema_core::*;
//!
//! let mut builder = ModelBuilder::new(Arc::new(Identity));
//! builder.add_schema("Thing", &SchemaConfig::default()).unwrap();
//! builder.add_schema("LegalEntity", &SchemaConfig {
//!     extends: vec!["Thing".into()],
//!     ..Default::default()
//! }).unwrap();
//! builder.add_schema("Person", &SchemaConfig {
//!     extends: vec!["LegalEntity".into()],
//!     ..Default::default()
//! }).unwrap();
//!
//! let model = builder.build().unwrap();
//! let person = model.get("Person").unwrap();
//! let names: Vec<&str> = person.names().iter().map(String::as_str).collect();
//! assert_eq!(names, vec!["LegalEntity", "Person", "Thing"]);
//! assert!(model.get("Thing").unwrap().descendants().contains("Person"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ReverseConfig, SchemaConfig};
use crate::error::{ModelError, Result};
use crate::property::Property;
use crate::schema::{DEFAULT_NAMESPACE, Schema, SchemaDict};
use crate::text::Translator;
use crate::types::{PropertyType, TypeDict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    InProgress,
    Done,
}

/// Mutable build phase of a [`Model`].
///
/// Add every schema first, then call [`build`](Self::build). Resolution
/// order does not matter: parents are always resolved before their
/// children, and a schema that is already resolved is skipped.
pub struct ModelBuilder {
    translator: Arc<dyn Translator>,
    namespace: String,
    schemata: BTreeMap<String, Schema>,
    state: HashMap<String, Resolution>,
    stack: Vec<String>,
}

impl ModelBuilder {
    /// Creates an empty builder resolving display text through
    /// `translator`.
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            namespace: DEFAULT_NAMESPACE.to_string(),
            schemata: BTreeMap::new(),
            state: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Sets the URI namespace for schemas without an `rdf` override.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Adds an unresolved schema.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateSchema`] if the name is taken, or
    /// [`ModelError::UnknownPropertyType`] for a bad property type.
    pub fn add_schema(&mut self, name: &str, config: &SchemaConfig) -> Result<&mut Self> {
        if self.schemata.contains_key(name) {
            return Err(ModelError::DuplicateSchema(name.to_string()));
        }
        let schema = Schema::new(name, config, &self.namespace, Arc::clone(&self.translator))?;
        self.schemata.insert(name.to_string(), schema);
        Ok(self)
    }

    /// Adds every schema of a name → config map.
    pub fn add_schemata<'a, I>(&mut self, configs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (&'a String, &'a SchemaConfig)>,
    {
        for (name, config) in configs {
            self.add_schema(name, config)?;
        }
        Ok(self)
    }

    /// Looks up a schema in its current, possibly unresolved, state.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemata.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemata.is_empty()
    }

    /// Resolves one schema and, recursively, its ancestors.
    ///
    /// Calling this again for a resolved schema does nothing. Consistency
    /// checks on `featured`, `caption`, `required` and edge endpoints are
    /// left to [`build`](Self::build), since reverse stubs added by schemas
    /// resolved later can still satisfy them.
    ///
    /// # Errors
    ///
    /// Any resolution [`ModelError`]. Schemas on the failing chain stay
    /// unresolved, so a later call reports the same error again.
    pub fn generate(&mut self, name: &str) -> Result<()> {
        match self.state.get(name) {
            Some(Resolution::Done) => return Ok(()),
            Some(Resolution::InProgress) => {
                let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
                let mut path = self.stack[start..].to_vec();
                path.push(name.to_string());
                return Err(ModelError::InheritanceCycle(path.join(" -> ")));
            }
            None => {}
        }
        let parents = match self.schemata.get(name) {
            Some(schema) => schema.declared_extends.clone(),
            None => return Err(ModelError::UnknownSchema(name.to_string())),
        };

        self.state.insert(name.to_string(), Resolution::InProgress);
        self.stack.push(name.to_string());
        let resolved = self.resolve(name, &parents);
        self.stack.pop();

        match resolved {
            Ok(()) => {
                self.state.insert(name.to_string(), Resolution::Done);
                debug!(
                    schema = name,
                    properties = self.schemata[name].properties.len(),
                    "resolved schema"
                );
                Ok(())
            }
            Err(err) => {
                self.state.remove(name);
                Err(err)
            }
        }
    }

    fn resolve(&mut self, name: &str, parents: &[String]) -> Result<()> {
        for parent in parents {
            if !self.schemata.contains_key(parent) {
                return Err(ModelError::MissingParent {
                    schema: name.to_string(),
                    parent: parent.clone(),
                });
            }
            self.generate(parent)?;
            self.inherit(name, parent);
        }

        let local: Vec<String> = self.schemata[name]
            .properties
            .values()
            .filter(|prop| prop.schema() == name)
            .map(|prop| prop.name().to_string())
            .collect();
        for prop_name in local {
            self.finalize_property(name, &prop_name)?;
        }
        Ok(())
    }

    /// Resolves every schema, checks each one for consistency and freezes
    /// the registry.
    ///
    /// # Errors
    ///
    /// The first [`ModelError`] hit during resolution, otherwise the first
    /// failed consistency check in name order.
    pub fn build(mut self) -> Result<Model> {
        let names: Vec<String> = self.schemata.keys().cloned().collect();
        for name in &names {
            self.generate(name)?;
        }
        for name in &names {
            self.check(name)?;
        }
        debug!(schemata = self.schemata.len(), "model resolved");
        Ok(Model {
            schemata: self.schemata,
        })
    }

    /// Merges a resolved parent into `name`. Properties already present
    /// win, so local definitions and earlier parents take precedence.
    fn inherit(&mut self, name: &str, parent: &str) {
        let (inherited, ancestors) = {
            let parent = &self.schemata[parent];
            (
                parent.properties.values().cloned().collect::<Vec<_>>(),
                parent.names.iter().cloned().collect::<Vec<_>>(),
            )
        };

        if let Some(schema) = self.schemata.get_mut(name) {
            for prop in inherited {
                schema
                    .properties
                    .entry(prop.name().to_string())
                    .or_insert(prop);
            }
            if !schema.extends.iter().any(|p| p == parent) {
                schema.extends.push(parent.to_string());
            }
            schema.names.extend(ancestors.iter().cloned());
        }
        for ancestor in &ancestors {
            if let Some(schema) = self.schemata.get_mut(ancestor) {
                schema.descendants.insert(name.to_string());
            }
        }
    }

    /// Checks a property's range and synthesizes its reverse link.
    fn finalize_property(&mut self, schema: &str, prop_name: &str) -> Result<()> {
        let Some(prop) = self.schemata[schema].properties.get(prop_name).cloned() else {
            return Ok(());
        };
        let Some(range) = prop.range() else {
            if prop.reverse_config().is_some() {
                return Err(ModelError::MissingRange {
                    property: prop.qname(),
                    range: String::new(),
                });
            }
            return Ok(());
        };
        if !self.schemata.contains_key(range) {
            return Err(ModelError::MissingRange {
                property: prop.qname(),
                range: range.to_string(),
            });
        }
        if prop.kind() == PropertyType::Entity {
            if let Some(fragment) = prop.reverse_config() {
                self.add_reverse(range, fragment, &prop)?;
            }
        }
        Ok(())
    }

    /// Makes sure `target` exposes the back-reference described by
    /// `fragment`, pointing at `origin`. Returns the name of the property.
    fn add_reverse(
        &mut self,
        target: &str,
        fragment: &ReverseConfig,
        origin: &Property,
    ) -> Result<String> {
        let Some(name) = fragment.name.as_deref() else {
            return Err(ModelError::UnnamedReverse(origin.qname()));
        };
        if self.schemata[target].properties.contains_key(name) {
            return Ok(name.to_string());
        }

        let stub = Property::reverse_of(target, name, fragment, origin);
        debug!(property = %stub.qname(), origin = %origin.qname(), "synthesized reverse property");
        let descendants: Vec<String> = {
            let schema = self
                .schemata
                .get_mut(target)
                .ok_or_else(|| ModelError::UnknownSchema(target.to_string()))?;
            schema.properties.insert(name.to_string(), stub.clone());
            schema.descendants.iter().cloned().collect()
        };
        for descendant in descendants {
            if let Some(schema) = self.schemata.get_mut(&descendant) {
                schema
                    .properties
                    .entry(name.to_string())
                    .or_insert_with(|| stub.clone());
            }
        }

        self.finalize_property(target, name)?;
        Ok(name.to_string())
    }

    fn check(&self, name: &str) -> Result<()> {
        let schema = &self.schemata[name];
        if let Some(featured) = schema.featured().iter().find(|p| schema.get(p).is_none()) {
            return Err(ModelError::MissingFeatured {
                schema: name.to_string(),
                property: featured.clone(),
            });
        }
        if let Some(caption) = schema.caption().iter().find(|p| schema.get(p).is_none()) {
            return Err(ModelError::MissingCaption {
                schema: name.to_string(),
                property: caption.clone(),
            });
        }
        if let Some(required) = schema.required().iter().find(|p| schema.get(p).is_none()) {
            return Err(ModelError::MissingRequired {
                schema: name.to_string(),
                property: required.clone(),
            });
        }
        if let (Some(source), Some(target)) = (schema.edge_source(), schema.edge_target()) {
            if schema.source_prop().is_none() {
                return Err(ModelError::MissingEdgeSource {
                    schema: name.to_string(),
                    property: source.to_string(),
                });
            }
            if schema.target_prop().is_none() {
                return Err(ModelError::MissingEdgeTarget {
                    schema: name.to_string(),
                    property: target.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Resolved, read-only schema registry.
///
/// A `Model` is `Send + Sync` and can be shared across threads behind an
/// `Arc` once built.
#[derive(Debug, Clone)]
pub struct Model {
    schemata: BTreeMap<String, Schema>,
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemata.get(name)
    }

    /// All schemas ordered by name.
    pub fn schemata(&self) -> impl Iterator<Item = &Schema> {
        self.schemata.values()
    }

    pub fn len(&self) -> usize {
        self.schemata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemata.is_empty()
    }

    /// Looks up a property by qualified name, `Schema:property`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use entity_schema_core::*;
    ///
    /// let mut builder = ModelBuilder::new(Arc::new(Identity));
    /// let mut thing = SchemaConfig::default();
    /// thing.properties.insert("name".into(), PropertyConfig::of_type("name"));
    /// builder.add_schema("Thing", &thing).unwrap();
    /// let model = builder.build().unwrap();
    ///
    /// assert_eq!(model.property("Thing:name").unwrap().kind(), PropertyType::Name);
    /// assert!(model.property("Thing:missing").is_none());
    /// assert!(model.property("no-colon").is_none());
    /// ```
    pub fn property(&self, qname: &str) -> Option<&Property> {
        let (schema, name) = qname.split_once(':')?;
        self.get(schema)?.get(name)
    }

    /// The more specific of two schemas, if one extends the other.
    pub fn common_schema(&self, left: &str, right: &str) -> Option<&Schema> {
        let left = self.get(left)?;
        let right = self.get(right)?;
        if left.is_a(right.name()) {
            Some(left)
        } else if right.is_a(left.name()) {
            Some(right)
        } else {
            None
        }
    }

    /// Serializable snapshot of every schema and the type registry.
    pub fn to_dict(&self) -> ModelDict {
        ModelDict {
            schemata: self
                .schemata
                .iter()
                .map(|(name, schema)| (name.clone(), schema.to_dict()))
                .collect(),
            types: PropertyType::ALL
                .into_iter()
                .map(|kind| (kind.name().to_string(), kind.to_dict()))
                .collect(),
        }
    }
}

/// Exported form of a [`Model`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDict {
    pub schemata: BTreeMap<String, SchemaDict>,
    pub types: BTreeMap<String, TypeDict>,
}
