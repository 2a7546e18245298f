//! Raw schema definitions as read from YAML or JSON.
//!
//! These are plain deserialization targets. They are turned into
//! [`Schema`](crate::Schema) and [`Property`](crate::Property) values by
//! [`ModelBuilder::add_schema`](crate::ModelBuilder::add_schema).
//!
//! # Example YAML
//!
//! ```yaml
//! Ownership:
//!   extends: Interest
//!   label: Ownership
//!   featured: [owner, asset]
//!   edge:
//!     source: owner
//!     target: asset
//!     label: owns
//!   properties:
//!     owner:
//!       type: entity
//!       range: LegalEntity
//!       reverse:
//!         name: ownershipOwner
//!     asset:
//!       type: entity
//!       range: Asset
//!       reverse:
//!         name: ownershipAsset
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Raw configuration of one schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Label text key (defaults to the schema name).
    pub label: Option<String>,
    /// Plural text key (defaults to the label).
    pub plural: Option<String>,
    pub description: Option<String>,
    /// Canonical URI override.
    pub rdf: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub generated: bool,
    /// Defaults to `true` when absent.
    pub matchable: Option<bool>,
    #[serde(deserialize_with = "one_or_many")]
    pub featured: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub required: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub caption: Vec<String>,
    /// Parent schemas, a single name or a list.
    #[serde(deserialize_with = "one_or_many")]
    pub extends: Vec<String>,
    pub edge: Option<EdgeConfig>,
    pub properties: BTreeMap<String, PropertyConfig>,
}

/// Projection of a relationship schema onto a graph edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub source: Option<String>,
    pub target: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub caption: Vec<String>,
    pub label: Option<String>,
    pub directed: bool,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            caption: Vec::new(),
            label: None,
            directed: true,
        }
    }
}

/// Raw configuration of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyConfig {
    pub label: Option<String>,
    pub description: Option<String>,
    /// Name of the [`PropertyType`](crate::PropertyType).
    #[serde(rename = "type")]
    pub type_name: String,
    pub hidden: bool,
    pub stub: bool,
    /// Defaults to the matchability of the property type.
    pub matchable: Option<bool>,
    /// Schema referenced by an entity-valued property.
    pub range: Option<String>,
    /// Back-reference to synthesize on the range schema.
    pub reverse: Option<ReverseConfig>,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            label: None,
            description: None,
            type_name: "string".to_string(),
            hidden: false,
            stub: false,
            matchable: None,
            range: None,
            reverse: None,
        }
    }
}

impl PropertyConfig {
    /// Creates a config of the given type name.
    pub fn of_type(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }
}

/// Reverse-link fragment of an entity-valued property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseConfig {
    /// Name of the property on the range schema. Required.
    pub name: Option<String>,
    pub label: Option<String>,
    /// Overrides the originating property's `hidden` flag.
    pub hidden: Option<bool>,
}

impl ReverseConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
        OneOrMany::Null(()) => Vec::new(),
    })
}
