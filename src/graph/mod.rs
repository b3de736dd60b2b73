//! In-memory graph store loaded from cleaned tables
//!
//! Node identifiers are unique per type tag. Adjacency is kept in both directions so that
//! one-hop neighborhoods are cheap to answer.

pub mod import;

pub use import::{import_directory, ImportReport};

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::core::{Edge, EntityId, Node};
use crate::error::{Error, Result};

/// A stored entity. The same id imported under several type tags carries all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: EntityId,
    pub label: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// The other end of an edge, seen from a given entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub id: EntityId,
    pub label: String,
    pub relation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighborhood<'a> {
    pub entity: &'a GraphNode,
    /// Edges leaving the entity
    pub outgoing: Vec<Neighbor>,
    /// Edges arriving at the entity
    pub incoming: Vec<Neighbor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    /// Node count per type tag
    pub tags: BTreeMap<String, usize>,
    /// Edge count per relation type
    pub relations: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<EntityId, GraphNode>,
    edges: Vec<Edge>,
    /// Edge indices by source
    outgoing: HashMap<EntityId, Vec<usize>>,
    /// Edge indices by target
    incoming: HashMap<EntityId, Vec<usize>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node`. Fails when a node with the same id and type tag already exists; the
    /// same id under another tag gains that tag and keeps its first label.
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if let Some(existing) = self.nodes.get_mut(&node.id) {
            if existing.tags.contains(&node.type_tag) {
                return Err(Error::Constraint(format!(
                    "{} with id {} already exists",
                    node.type_tag, node.id
                )));
            }
            existing.tags.push(node.type_tag);
            for (name, value) in node.properties {
                existing.properties.entry(name).or_insert(value);
            }
            return Ok(());
        }

        self.nodes.insert(
            node.id.clone(),
            GraphNode {
                id: node.id,
                label: node.label,
                tags: vec![node.type_tag],
                properties: node.properties,
            },
        );
        Ok(())
    }

    /// Add `edge` if both endpoints are stored. Returns `false` when it was skipped.
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            return false;
        }
        let index = self.edges.len();
        self.outgoing.entry(edge.source.clone()).or_default().push(index);
        self.incoming.entry(edge.target.clone()).or_default().push(index);
        self.edges.push(edge);
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn entity(&self, id: &EntityId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Entities whose label contains `term`, ignoring case, ordered by label then id.
    pub fn search(&self, term: &str, limit: usize) -> Vec<&GraphNode> {
        let needle = term.to_lowercase();
        let mut hits: Vec<&GraphNode> =
            self.nodes.values().filter(|n| n.label.to_lowercase().contains(&needle)).collect();
        hits.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        hits
    }

    /// One-hop neighborhood of `id` in both directions.
    pub fn neighbors(&self, id: &EntityId) -> Option<Neighborhood<'_>> {
        let entity = self.nodes.get(id)?;

        Some(Neighborhood {
            entity,
            outgoing: self.adjacent(self.outgoing.get(id), |e| &e.target),
            incoming: self.adjacent(self.incoming.get(id), |e| &e.source),
        })
    }

    fn adjacent(&self, index: Option<&Vec<usize>>, other_end: fn(&Edge) -> &EntityId) -> Vec<Neighbor> {
        index
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
            .map(|edge| {
                let other = other_end(edge);
                Neighbor {
                    id: other.clone(),
                    label: self.nodes.get(other).map(|n| n.label.clone()).unwrap_or_default(),
                    relation: edge.relation.clone(),
                }
            })
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats =
            GraphStats { nodes: self.nodes.len(), edges: self.edges.len(), ..Default::default() };
        for node in self.nodes.values() {
            for tag in &node.tags {
                *stats.tags.entry(tag.clone()).or_default() += 1;
            }
        }
        for edge in &self.edges {
            *stats.relations.entry(edge.relation.clone()).or_default() += 1;
        }
        stats
    }
}
