//! Property-graph projection of entity records.
//!
//! Entities of edge schemas (those declaring both `edge.source` and
//! `edge.target`) become edges between the referenced entities. All other
//! entities become nodes, linked to value nodes for every property whose
//! type is a matchable pivot type, so that entities sharing a phone number
//! or an address end up adjacent.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use entity_schema_core::*;
//!
//! let definitions: std::collections::BTreeMap<String, SchemaConfig> =
//!     serde_json::from_value(serde_json::json!({
//!         "Person": {"properties": {"email": {"type": "email"}}},
//!         "Family": {
//!             "edge": {"source": "person", "target": "relative"},
//!             "properties": {
//!                 "person": {"type": "entity", "range": "Person"},
//!                 "relative": {"type": "entity", "range": "Person"}
//!             }
//!         }
//!     })).unwrap();
//! let mut builder = ModelBuilder::new(Arc::new(Identity));
//! builder.add_schemata(&definitions).unwrap();
//! let model = builder.build().unwrap();
//!
//! let mut graph = Graph::new(&model);
//! graph.add(&EntityRecord::new("ada", "Person").with_value("email", "ada@example.com"));
//! graph.add(
//!     &EntityRecord::new("fam-1", "Family")
//!         .with_value("person", "ada")
//!         .with_value("relative", "byron"),
//! );
//!
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.edge_count(), 2);
//! assert!(graph.edge("id:ada<fam-1>id:byron").is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::Model;
use crate::property::Property;
use crate::schema::Schema;
use crate::types::PropertyType;

/// An entity instance: an id, a schema name and property values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub schema: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

impl EntityRecord {
    pub fn new(id: &str, schema: &str) -> Self {
        Self {
            id: id.to_string(),
            schema: schema.to_string(),
            properties: BTreeMap::new(),
        }
    }

    /// Appends a value to a property.
    pub fn with_value(mut self, property: &str, value: &str) -> Self {
        self.properties
            .entry(property.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    pub fn values(&self, property: &str) -> &[String] {
        self.properties
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every (source, target) value pair of an edge schema.
    pub fn edge_pairs(&self, schema: &Schema) -> Vec<(String, String)> {
        let (Some(source), Some(target)) = (schema.edge_source(), schema.edge_target()) else {
            return Vec::new();
        };
        let mut pairs = Vec::new();
        for source in self.values(source) {
            for target in self.values(target) {
                pairs.push((source.clone(), target.clone()));
            }
        }
        pairs
    }

    /// First available caption value, falling back to the id.
    pub fn caption(&self, schema: &Schema) -> String {
        schema
            .caption()
            .iter()
            .find_map(|prop| self.values(prop).first())
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }
}

/// A graph node: an entity or a reified value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub value: String,
    pub caption: String,
    /// Schema of an entity node, or the expected range of a stub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// `false` for entity nodes only known by reference.
    #[serde(skip)]
    pub resolved: bool,
}

impl Node {
    pub fn is_entity(&self) -> bool {
        self.kind == PropertyType::Entity
    }
}

/// A link between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Edge schema name, or qualified name of the originating property.
    pub type_name: String,
    /// Id of the entity projected as this edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

/// Exported form of a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDict {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// In-memory node/edge set built from entity records.
#[derive(Debug)]
pub struct Graph<'m> {
    model: &'m Model,
    edge_types: BTreeSet<PropertyType>,
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
}

impl<'m> Graph<'m> {
    /// Creates an empty graph using every matchable pivot type for value
    /// edges.
    pub fn new(model: &'m Model) -> Self {
        let edge_types = PropertyType::ALL
            .into_iter()
            .filter(|kind| kind.pivot() && kind.matchable())
            .collect();
        Self::with_edge_types(model, edge_types)
    }

    /// Creates an empty graph with an explicit set of value edge types.
    /// Non-matchable types are dropped.
    pub fn with_edge_types(model: &'m Model, edge_types: BTreeSet<PropertyType>) -> Self {
        Self {
            model,
            edge_types: edge_types.into_iter().filter(PropertyType::matchable).collect(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Projects one entity into the graph. Records of unknown schemas are
    /// skipped.
    pub fn add(&mut self, record: &EntityRecord) {
        let model = self.model;
        let Some(schema) = model.get(&record.schema) else {
            warn!(entity = %record.id, schema = %record.schema, "skipping entity of unknown schema");
            return;
        };
        if schema.is_edge() {
            self.add_edge_entity(schema, record);
        } else {
            self.add_node_entity(schema, record);
        }
    }

    fn add_edge_entity(&mut self, schema: &Schema, record: &EntityRecord) {
        let (Some(source_prop), Some(target_prop)) = (schema.source_prop(), schema.target_prop())
        else {
            return;
        };
        for (source, target) in record.edge_pairs(schema) {
            let source_id = self.node_stub(source_prop, &source);
            let target_id = self.node_stub(target_prop, &target);
            let edge = Edge {
                id: format!("{source_id}<{}>{target_id}", record.id),
                source_id,
                target_id,
                type_name: schema.name().to_string(),
                entity: Some(record.id.clone()),
            };
            self.edges.insert(edge.id.clone(), edge);
        }
    }

    fn add_node_entity(&mut self, schema: &Schema, record: &EntityRecord) {
        let node = Node {
            id: PropertyType::Entity.node_id(&record.id),
            kind: PropertyType::Entity,
            value: record.id.clone(),
            caption: record.caption(schema),
            schema: Some(schema.name().to_string()),
            resolved: true,
        };
        let entity_id = node.id.clone();
        self.nodes.insert(entity_id.clone(), node);

        for (name, values) in &record.properties {
            let Some(prop) = schema.get(name) else {
                continue;
            };
            if !self.edge_types.contains(&prop.kind()) {
                continue;
            }
            for value in values {
                let target_id = self.node_stub(prop, value);
                let edge = Edge {
                    id: format!("{entity_id}<>{target_id}"),
                    source_id: entity_id.clone(),
                    target_id,
                    type_name: prop.qname(),
                    entity: None,
                };
                self.edges.insert(edge.id.clone(), edge);
            }
        }
    }

    /// Returns the id of the node for `value`, creating an unresolved node
    /// if it does not exist yet.
    fn node_stub(&mut self, prop: &Property, value: &str) -> String {
        let id = prop.kind().node_id(value);
        self.nodes.entry(id.clone()).or_insert_with(|| Node {
            id: id.clone(),
            kind: prop.kind(),
            value: value.to_string(),
            caption: value.to_string(),
            schema: prop.range().map(str::to_string),
            resolved: prop.kind() != PropertyType::Entity,
        });
        id
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ids of entities referenced by edges but never added themselves.
    pub fn queued(&self) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|node| node.is_entity() && !node.resolved)
            .map(|node| node.value.as_str())
            .collect()
    }

    /// Edges leaving `node_id`.
    pub fn outbound<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.values().filter(move |edge| edge.source_id == node_id)
    }

    /// Edges pointing at `node_id`.
    pub fn inbound<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.values().filter(move |edge| edge.target_id == node_id)
    }

    /// All edges touching `node_id`.
    pub fn adjacent<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.outbound(node_id).chain(self.inbound(node_id))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    pub fn to_dict(&self) -> GraphDict {
        GraphDict {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::tests::model_from;

    fn model() -> Model {
        model_from(json!({
            "Thing": {
                "caption": ["name"],
                "properties": {"name": {"type": "name"}, "notes": {"type": "text"}}
            },
            "LegalEntity": {
                "extends": "Thing",
                "properties": {"phone": {"type": "phone"}, "amount": {"type": "number"}}
            },
            "Ownership": {
                "edge": {"source": "owner", "target": "asset"},
                "properties": {
                    "owner": {"type": "entity", "range": "LegalEntity"},
                    "asset": {"type": "entity", "range": "Thing"}
                }
            }
        }))
    }

    #[test]
    fn test_node_entity_with_value_edges() {
        let model = model();
        let mut graph = Graph::new(&model);
        graph.add(
            &EntityRecord::new("acme", "LegalEntity")
                .with_value("name", "ACME Inc.")
                .with_value("phone", "+1 555 0100")
                .with_value("notes", "not a pivot")
                .with_value("amount", "12"),
        );

        let node = graph.node("id:acme").unwrap();
        assert_eq!(node.caption, "ACME Inc.");
        assert_eq!(node.schema.as_deref(), Some("LegalEntity"));
        assert!(graph.node("phone:+1 555 0100").is_some());
        assert!(graph.node("name:ACME Inc.").is_some());
        assert!(graph.node("text:not a pivot").is_none());
        assert_eq!(graph.edge_count(), 2);

        let types: Vec<&str> = graph.outbound("id:acme").map(|e| e.type_name.as_str()).collect();
        assert_eq!(types, vec!["Thing:name", "LegalEntity:phone"]);
    }

    #[test]
    fn test_shared_values_connect_entities() {
        let model = model();
        let mut graph = Graph::new(&model);
        graph.add(&EntityRecord::new("a", "LegalEntity").with_value("phone", "+1 555 0100"));
        graph.add(&EntityRecord::new("b", "LegalEntity").with_value("phone", "+1 555 0100"));
        assert_eq!(graph.inbound("phone:+1 555 0100").count(), 2);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_edge_entity_produces_edge_per_pair() {
        let model = model();
        let mut graph = Graph::new(&model);
        graph.add(
            &EntityRecord::new("own-1", "Ownership")
                .with_value("owner", "acme")
                .with_value("owner", "globex")
                .with_value("asset", "tower"),
        );
        assert_eq!(graph.edge_count(), 2);
        let edge = graph.edge("id:acme<own-1>id:tower").unwrap();
        assert_eq!(edge.type_name, "Ownership");
        assert_eq!(edge.entity.as_deref(), Some("own-1"));
        assert_eq!(graph.adjacent("id:tower").count(), 2);
        assert_eq!(graph.node("id:acme").unwrap().schema.as_deref(), Some("LegalEntity"));

        let mut queued = graph.queued();
        queued.sort();
        assert_eq!(queued, vec!["acme", "globex", "tower"]);

        graph.add(&EntityRecord::new("acme", "LegalEntity").with_value("name", "ACME"));
        assert!(!graph.queued().contains(&"acme"));
    }

    #[test]
    fn test_unknown_schema_is_skipped() {
        let model = model();
        let mut graph = Graph::new(&model);
        graph.add(&EntityRecord::new("x", "Spaceship"));
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_to_dict_shape() {
        let model = model();
        let mut graph = Graph::with_edge_types(&model, BTreeSet::from([PropertyType::Name]));
        graph.add(
            &EntityRecord::new("acme", "LegalEntity")
                .with_value("name", "ACME")
                .with_value("phone", "+1 555 0100"),
        );
        let dict = serde_json::to_value(graph.to_dict()).unwrap();
        assert_eq!(
            dict,
            json!({
                "nodes": [
                    {"id": "id:acme", "type": "entity", "value": "acme", "caption": "ACME", "schema": "LegalEntity"},
                    {"id": "name:ACME", "type": "name", "value": "ACME", "caption": "ACME"}
                ],
                "edges": [
                    {"id": "id:acme<>name:ACME", "source_id": "id:acme", "target_id": "name:ACME", "type_name": "Thing:name"}
                ]
            })
        );
        graph.clear();
        assert_eq!(graph.node_count(), 0);
    }
}
