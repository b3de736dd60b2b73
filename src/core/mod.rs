//! Core data structures for the extracted graph

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod tables;
pub use tables::*;

/// Stable identifier of an entity: the trailing path segment of its URI
/// (`http://www.wikidata.org/entity/Q12345` -> `Q12345`). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an already extracted identifier. Returns `None` for blank input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Derive the identifier from a URI's last `/`-delimited segment.
    pub fn from_uri(uri: &str) -> Option<Self> {
        uri.rsplit('/').next().and_then(|segment| Self::new(segment.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for Wikidata item identifiers of the form `Q<digits>`.
    pub fn is_qid(&self) -> bool {
        self.0
            .strip_prefix('Q')
            .map_or(false, |digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity with its human-readable label and category tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub label: String,
    pub type_tag: String,
    /// Optional per-category properties (birth date, genre, ...). Only present values are kept.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: EntityId, label: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self { id, label: label.into(), type_tag: type_tag.into(), properties: BTreeMap::new() }
    }

    /// Attach a property; empty values are treated as absent.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.properties.insert(name.into(), value);
        }
        self
    }

    /// A node whose label is just its identifier never had a label resolved.
    pub fn has_resolved_label(&self) -> bool {
        self.label != self.id.as_str()
    }
}

/// Directed relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: EntityId,
    pub target: EntityId,
    pub relation: String,
}

impl Edge {
    pub fn new(source: EntityId, target: EntityId, relation: impl Into<String>) -> Self {
        Self { source, target, relation: relation.into() }
    }
}

/// Everything the pagination loop has accumulated so far.
///
/// Mutated only by the pagination driver after a batch has been validated, and
/// persisted as a whole by the checkpoint manager.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub nodes: NodeTable,
    pub edges: EdgeCollection,
    /// Offset of the next batch to request.
    pub next_offset: u64,
}

impl PipelineState {
    pub fn new(strategy: EdgeStrategy) -> Self {
        Self { nodes: NodeTable::new(), edges: EdgeCollection::new(strategy), next_offset: 0 }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_from_uri() {
        let id = EntityId::from_uri("http://www.wikidata.org/entity/Q12345").unwrap();
        assert_eq!(id.as_str(), "Q12345");
        assert!(id.is_qid());
    }

    #[test]
    fn test_entity_id_rejects_trailing_slash() {
        assert!(EntityId::from_uri("http://www.wikidata.org/entity/").is_none());
        assert!(EntityId::new("   ").is_none());
    }

    #[test]
    fn test_is_qid() {
        assert!(!EntityId::new("P737").unwrap().is_qid());
        assert!(!EntityId::new("Q").unwrap().is_qid());
        assert!(!EntityId::new("Q12a").unwrap().is_qid());
        assert!(EntityId::new("Q5").unwrap().is_qid());
    }

    #[test]
    fn test_node_empty_property_is_absent() {
        let node = Node::new(EntityId::new("Q1").unwrap(), "Universe", "Entity")
            .with_property("inception", "")
            .with_property("country", "none");
        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.properties.get("country").map(String::as_str), Some("none"));
    }

    #[test]
    fn test_unresolved_label() {
        let node = Node::new(EntityId::new("Q42").unwrap(), "Q42", "Human");
        assert!(!node.has_resolved_label());
    }
}
