//! Schema definitions and the operations on a resolved schema.
//!
//! A [`Schema`] is created from a [`SchemaConfig`] with its locally declared
//! properties only. Inherited properties, the ancestor closure and the
//! descendant index are filled in by
//! [`ModelBuilder::generate`](crate::ModelBuilder::generate). Everything in
//! this module besides construction assumes a resolved schema.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::{ErrorMap, InvalidData, Result};
use crate::model::Model;
use crate::property::{Property, PropertyDict};
use crate::text::Translator;

/// Namespace for schema URIs without an explicit `rdf` override.
pub const DEFAULT_NAMESPACE: &str = "urn:entity-schema:";

/// A named entity or relationship type.
///
/// Schemas compare and hash by name.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use entity_schema_core::*;
///
/// let thing: SchemaConfig = serde_json::from_value(serde_json::json!({
///     "properties": {"name": {"type": "name"}},
///     "caption": ["name"],
///     "required": ["name"]
/// })).unwrap();
/// let person: SchemaConfig = serde_json::from_value(serde_json::json!({
///     "extends": "Thing",
///     "plural": "People",
///     "properties": {"birthDate": {"type": "date"}}
/// })).unwrap();
///
/// let mut builder = ModelBuilder::new(Arc::new(Identity));
/// builder.add_schema("Thing", &thing).unwrap();
/// builder.add_schema("Person", &person).unwrap();
/// let model = builder.build().unwrap();
///
/// let person = model.get("Person").unwrap();
/// assert!(person.is_a("Thing"));
/// assert!(person.get("name").is_some());
/// assert_eq!(person.plural(), "People");
/// assert!(person.validate(&serde_json::json!({})).is_err());
/// ```
#[derive(Clone)]
pub struct Schema {
    name: String,
    label: String,
    plural: String,
    description: Option<String>,
    uri: String,
    is_abstract: bool,
    generated: bool,
    matchable: bool,
    featured: Vec<String>,
    required: Vec<String>,
    caption: Vec<String>,
    edge_source: Option<String>,
    edge_target: Option<String>,
    edge_caption: Vec<String>,
    edge_label: String,
    edge_directed: bool,
    pub(crate) declared_extends: Vec<String>,
    pub(crate) extends: Vec<String>,
    pub(crate) names: BTreeSet<String>,
    pub(crate) descendants: BTreeSet<String>,
    pub(crate) properties: BTreeMap<String, Property>,
    translator: Arc<dyn Translator>,
}

impl Schema {
    /// Builds an unresolved schema holding only its local properties.
    ///
    /// # Errors
    ///
    /// Propagates [`ModelError::UnknownPropertyType`](crate::ModelError::UnknownPropertyType)
    /// from property construction.
    pub fn new(
        name: &str,
        config: &SchemaConfig,
        namespace: &str,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        let label = config.label.clone().unwrap_or_else(|| name.to_string());
        let plural = config.plural.clone().unwrap_or_else(|| label.clone());
        let edge = config.edge.clone().unwrap_or_default();

        let mut properties = BTreeMap::new();
        for (prop_name, prop_config) in &config.properties {
            let prop = Property::new(name, prop_name, prop_config, Arc::clone(&translator))?;
            properties.insert(prop_name.clone(), prop);
        }

        Ok(Self {
            name: name.to_string(),
            uri: config
                .rdf
                .clone()
                .unwrap_or_else(|| format!("{namespace}{name}")),
            edge_label: edge.label.unwrap_or_else(|| label.clone()),
            label,
            plural,
            description: config.description.clone(),
            is_abstract: config.is_abstract,
            generated: config.generated,
            matchable: config.matchable.unwrap_or(true),
            featured: config.featured.clone(),
            required: config.required.clone(),
            caption: config.caption.clone(),
            edge_source: edge.source,
            edge_target: edge.target,
            edge_caption: edge.caption,
            edge_directed: edge.directed,
            declared_extends: config.extends.clone(),
            extends: Vec::new(),
            names: BTreeSet::from([name.to_string()]),
            descendants: BTreeSet::new(),
            properties,
            translator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> String {
        self.translator.gettext(&self.label)
    }

    pub fn plural(&self) -> String {
        self.translator.gettext(&self.plural)
    }

    pub fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(|key| self.translator.gettext(key))
    }

    /// Canonical identifier URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Hidden from listings.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Created by the system rather than by users.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Eligible for cross-entity matching.
    pub fn is_matchable(&self) -> bool {
        self.matchable
    }

    pub fn featured(&self) -> &[String] {
        &self.featured
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn caption(&self) -> &[String] {
        &self.caption
    }

    /// `true` when both an edge source and target are declared.
    pub fn is_edge(&self) -> bool {
        self.edge_source.is_some() && self.edge_target.is_some()
    }

    pub fn edge_source(&self) -> Option<&str> {
        self.edge_source.as_deref()
    }

    pub fn edge_target(&self) -> Option<&str> {
        self.edge_target.as_deref()
    }

    pub fn edge_caption(&self) -> &[String] {
        &self.edge_caption
    }

    pub fn edge_label(&self) -> String {
        self.translator.gettext(&self.edge_label)
    }

    pub fn edge_directed(&self) -> bool {
        self.edge_directed
    }

    /// The property holding edge sources.
    pub fn source_prop(&self) -> Option<&Property> {
        self.edge_source.as_deref().and_then(|name| self.get(name))
    }

    /// The property holding edge targets.
    pub fn target_prop(&self) -> Option<&Property> {
        self.edge_target.as_deref().and_then(|name| self.get(name))
    }

    /// Direct parents in declaration order.
    pub fn extends(&self) -> &[String] {
        &self.extends
    }

    /// Names of all ancestors, this schema included.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Names of all schemas that directly or indirectly extend this one.
    pub fn descendants(&self) -> &BTreeSet<String> {
        &self.descendants
    }

    /// All ancestor schemas, this schema included.
    pub fn ancestors<'m>(&self, model: &'m Model) -> impl Iterator<Item = &'m Schema> {
        self.names.iter().filter_map(move |name| model.get(name))
    }

    /// Merged property set, local and inherited.
    pub fn properties(&self) -> &BTreeMap<String, Property> {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// `true` if this schema is `parent` or extends it.
    pub fn is_a(&self, parent: &str) -> bool {
        self.names.contains(parent)
    }

    /// Properties for display: caption first, then featured, then the
    /// rest, each group ordered by label.
    pub fn sorted_properties(&self) -> Vec<&Property> {
        let mut props: Vec<(bool, bool, String, &Property)> = self
            .properties
            .values()
            .map(|prop| {
                (
                    !self.caption.iter().any(|c| c == prop.name()),
                    !self.featured.iter().any(|f| f == prop.name()),
                    prop.label(),
                    prop,
                )
            })
            .collect();
        props.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
        props.into_iter().map(|(_, _, _, prop)| prop).collect()
    }

    /// Schemas worth comparing entities of this schema against.
    ///
    /// Walks ancestors and descendants and keeps the matchable ones. Yields
    /// nothing if this schema is not matchable itself. Recomputed on every
    /// call.
    pub fn matchable_schemata<'m>(
        &'m self,
        model: &'m Model,
    ) -> impl Iterator<Item = &'m Schema> + 'm {
        self.names
            .iter()
            .chain(self.descendants.iter())
            .take_while(move |_| self.matchable)
            .filter_map(move |name| model.get(name))
            .filter(|schema| schema.matchable)
    }

    /// Validates entity data shaped as `{"properties": {name: value(s)}}`.
    ///
    /// Property names the schema does not define are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidData`] listing every property with a bad value or a
    /// missing required value.
    pub fn validate(&self, data: &Value) -> std::result::Result<(), InvalidData> {
        let supplied = data.get("properties").and_then(Value::as_object);
        let mut errors = ErrorMap::default();

        for (name, prop) in &self.properties {
            let values: Vec<Value> = match supplied.and_then(|props| props.get(name)) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
            };
            let mut error = prop.validate(&values);
            if error.is_none() && values.is_empty() && self.required.iter().any(|r| r == name) {
                error = Some(self.translator.gettext("Required"));
            }
            if let Some(message) = error {
                errors.properties.insert(name.clone(), message);
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        Err(InvalidData {
            message: self.translator.gettext("Entity validation failed"),
            errors,
        })
    }

    /// Sparse snapshot for export. Only locally owned properties are
    /// included; inherited ones are reachable through `extends`.
    pub fn to_dict(&self) -> SchemaDict {
        let edge = match (&self.edge_source, &self.edge_target) {
            (Some(source), Some(target)) => Some(EdgeDict {
                source: source.clone(),
                target: target.clone(),
                caption: self.edge_caption.clone(),
                label: self.edge_label(),
                directed: self.edge_directed,
            }),
            _ => None,
        };
        let mut extends = self.extends.clone();
        extends.sort();

        SchemaDict {
            label: self.label(),
            plural: self.plural(),
            uri: self.uri.clone(),
            schemata: self.names.iter().cloned().collect(),
            extends,
            edge,
            featured: self.featured.clone(),
            required: self.required.clone(),
            caption: self.caption.clone(),
            description: self.description(),
            is_abstract: self.is_abstract,
            generated: self.generated,
            matchable: self.matchable,
            properties: self
                .properties
                .iter()
                .filter(|(_, prop)| prop.schema() == self.name)
                .map(|(name, prop)| (name.clone(), prop.to_dict()))
                .collect(),
        }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Schema {}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Schema {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Schema {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("extends", &self.extends)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Exported edge projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDict {
    pub source: String,
    pub target: String,
    pub caption: Vec<String>,
    pub label: String,
    pub directed: bool,
}

/// Exported form of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDict {
    pub label: String,
    pub plural: String,
    pub uri: String,
    /// Sorted ancestor names, this schema included.
    pub schemata: Vec<String>,
    /// Sorted direct parent names.
    pub extends: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeDict>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub featured: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub generated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub matchable: bool,
    pub properties: BTreeMap<String, PropertyDict>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::model::tests::model_from;

    #[test]
    fn test_validate_empty_data_reports_required() {
        let model = model_from(json!({
            "Thing": {"properties": {"name": {"type": "name"}}, "required": ["name"]}
        }));
        let err = model.get("Thing").unwrap().validate(&json!({})).unwrap_err();
        assert_eq!(err.message, "Entity validation failed");
        assert_eq!(
            serde_json::to_value(&err.errors).unwrap(),
            json!({"properties": {"name": "Required"}})
        );
    }

    #[test]
    fn test_validate_ignores_unknown_properties() {
        let model = model_from(json!({
            "Thing": {"properties": {"name": {"type": "name"}}}
        }));
        let thing = model.get("Thing").unwrap();
        assert!(
            thing
                .validate(&json!({"properties": {"unknownField": ["x"]}}))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_null_inside_list_counts_as_value() {
        let model = model_from(json!({
            "Thing": {"properties": {"name": {"type": "name"}}, "required": ["name"]}
        }));
        let thing = model.get("Thing").unwrap();
        assert!(thing.validate(&json!({"properties": {"name": [null]}})).is_ok());

        let err = thing
            .validate(&json!({"properties": {"name": null}}))
            .unwrap_err();
        assert_eq!(err.errors.properties["name"], "Required");
    }

    #[test]
    fn test_validate_scalar_and_list_values() {
        let model = model_from(json!({
            "Person": {
                "required": ["name"],
                "properties": {
                    "name": {"type": "name"},
                    "birthDate": {"type": "date"},
                    "email": {"type": "email"}
                }
            }
        }));
        let person = model.get("Person").unwrap();
        assert!(
            person
                .validate(&json!({"properties": {"name": "Ada", "birthDate": ["1815-12-10"]}}))
                .is_ok()
        );

        let err = person
            .validate(&json!({"properties": {
                "name": [],
                "birthDate": "December",
                "email": ["ada@example.com", "nope"]
            }}))
            .unwrap_err();
        assert_eq!(
            serde_json::to_value(&err.errors).unwrap(),
            json!({"properties": {
                "name": "Required",
                "birthDate": "Invalid value",
                "email": "Invalid value"
            }})
        );
    }

    #[test]
    fn test_required_inherited_property() {
        let model = model_from(json!({
            "Thing": {"properties": {"name": {"type": "name"}}},
            "Person": {"extends": "Thing", "required": ["name"]}
        }));
        assert!(model.get("Thing").unwrap().validate(&json!({})).is_ok());
        assert!(model.get("Person").unwrap().validate(&json!({})).is_err());
    }

    #[test]
    fn test_sorted_properties_caption_featured_then_label() {
        let model = model_from(json!({
            "Company": {
                "caption": ["name"],
                "featured": ["jurisdiction", "name"],
                "properties": {
                    "address": {"label": "Address"},
                    "jurisdiction": {"label": "Jurisdiction", "type": "country"},
                    "name": {"label": "Name", "type": "name"},
                    "alias": {"label": "Other name", "type": "name"},
                    "email": {"label": "E-Mail", "type": "email"}
                }
            }
        }));
        let names: Vec<&str> = model
            .get("Company")
            .unwrap()
            .sorted_properties()
            .into_iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["name", "jurisdiction", "address", "email", "alias"]);
    }

    #[test]
    fn test_matchable_schemata_covers_family() {
        let model = model_from(json!({
            "Thing": {"matchable": false},
            "LegalEntity": {"extends": "Thing"},
            "Company": {"extends": "LegalEntity"},
            "Person": {"extends": "LegalEntity"},
            "Vessel": {"extends": "Thing"}
        }));
        let legal = model.get("LegalEntity").unwrap();
        let names: Vec<&str> = legal
            .matchable_schemata(&model)
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["LegalEntity", "Company", "Person"]);

        let company = model.get("Company").unwrap();
        let names: Vec<&str> = company
            .matchable_schemata(&model)
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["Company", "LegalEntity"]);
    }

    #[test]
    fn test_matchable_schemata_empty_when_not_matchable() {
        let model = model_from(json!({
            "Thing": {},
            "Asset": {"extends": "Thing", "matchable": false},
            "Vessel": {"extends": "Asset"}
        }));
        let asset = model.get("Asset").unwrap();
        assert_eq!(asset.matchable_schemata(&model).count(), 0);
    }

    #[test]
    fn test_to_dict_is_sparse() {
        let model = model_from(json!({
            "Thing": {"properties": {"name": {"type": "name"}}},
            "Person": {"extends": "Thing", "properties": {"birthDate": {"type": "date"}}}
        }));
        let dict = serde_json::to_value(model.get("Person").unwrap().to_dict()).unwrap();
        let map = dict.as_object().unwrap();
        assert!(map.get("featured").is_none());
        assert!(map.get("required").is_none());
        assert!(map.get("caption").is_none());
        assert!(map.get("edge").is_none());
        assert!(map.get("description").is_none());
        assert!(map.get("abstract").is_none());
        assert_eq!(map["matchable"], json!(true));
        assert_eq!(map["schemata"], json!(["Person", "Thing"]));
        assert_eq!(map["extends"], json!(["Thing"]));
        assert_eq!(map["uri"], json!("urn:entity-schema:Person"));
        let props = map["properties"].as_object().unwrap();
        assert!(props.contains_key("birthDate"));
        assert!(!props.contains_key("name"));
    }

    #[test]
    fn test_to_dict_edge_requires_source_and_target() {
        let model = model_from(json!({
            "Thing": {"properties": {"name": {}}},
            "Link": {
                "edge": {"source": "name"},
                "properties": {"name": {}}
            },
            "Ownership": {
                "abstract": true,
                "edge": {"source": "owner", "target": "asset", "label": "owns"},
                "featured": ["owner"],
                "properties": {
                    "owner": {"type": "entity", "range": "Thing"},
                    "asset": {"type": "entity", "range": "Thing"}
                }
            }
        }));
        let link = serde_json::to_value(model.get("Link").unwrap().to_dict()).unwrap();
        assert!(link.get("edge").is_none());

        let ownership = serde_json::to_value(model.get("Ownership").unwrap().to_dict()).unwrap();
        assert_eq!(
            ownership["edge"],
            json!({
                "source": "owner",
                "target": "asset",
                "caption": [],
                "label": "owns",
                "directed": true
            })
        );
        assert_eq!(ownership["abstract"], json!(true));
        assert_eq!(ownership["featured"], json!(["owner"]));
    }
}
