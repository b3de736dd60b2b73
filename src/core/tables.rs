//! Node table and edge collections with their merge semantics

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::core::{Edge, EntityId, Node};

/// Insertion-ordered map from entity id to node. Upserts keep the first node seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable {
    index: HashMap<EntityId, usize>,
    nodes: Vec<Node>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` unless its id is already present. Returns `true` when inserted.
    pub fn upsert(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn get(&self, id: &EntityId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

impl FromIterator<Node> for NodeTable {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut table = NodeTable::new();
        for node in iter {
            table.upsert(node);
        }
        table
    }
}

/// How edges are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStrategy {
    /// Keep every edge in arrival order, duplicates of `(source, target)` included.
    Ordered,
    /// One edge per `(source, target)` pair; the relation label of later duplicates is dropped.
    UniquePairs,
}

impl fmt::Display for EdgeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeStrategy::Ordered => f.write_str("ordered"),
            EdgeStrategy::UniquePairs => f.write_str("unique_pairs"),
        }
    }
}

impl FromStr for EdgeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ordered" | "list" => Ok(EdgeStrategy::Ordered),
            "unique_pairs" | "set" => Ok(EdgeStrategy::UniquePairs),
            other => Err(format!("Unknown edge strategy: {}", other)),
        }
    }
}

/// Edges accumulated by the pipeline under a fixed [`EdgeStrategy`].
#[derive(Debug, Clone)]
pub struct EdgeCollection {
    strategy: EdgeStrategy,
    edges: Vec<Edge>,
    pairs: HashSet<(EntityId, EntityId)>,
}

impl EdgeCollection {
    pub fn new(strategy: EdgeStrategy) -> Self {
        Self { strategy, edges: Vec::new(), pairs: HashSet::new() }
    }

    pub fn strategy(&self) -> EdgeStrategy {
        self.strategy
    }

    /// Add an edge. Returns `false` when the unique-pair strategy already holds the pair.
    pub fn add(&mut self, edge: Edge) -> bool {
        if self.strategy == EdgeStrategy::UniquePairs
            && !self.pairs.insert((edge.source.clone(), edge.target.clone()))
        {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Build a collection from stored edges, re-applying the strategy.
    pub fn from_edges(strategy: EdgeStrategy, edges: impl IntoIterator<Item = Edge>) -> Self {
        let mut collection = Self::new(strategy);
        for edge in edges {
            collection.add(edge);
        }
        collection
    }
}

impl PartialEq for EdgeCollection {
    fn eq(&self, other: &Self) -> bool {
        if self.strategy != other.strategy {
            return false;
        }
        match self.strategy {
            EdgeStrategy::Ordered => self.edges == other.edges,
            EdgeStrategy::UniquePairs => self.pairs == other.pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s).unwrap()
    }

    #[test]
    fn test_upsert_keeps_first_label() {
        let mut table = NodeTable::new();
        assert!(table.upsert(Node::new(id("Q1"), "A", "Entity")));
        assert!(!table.upsert(Node::new(id("Q1"), "B", "Entity")));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&id("Q1")).unwrap().label, "A");
    }

    #[test]
    fn test_node_table_preserves_insertion_order() {
        let table: NodeTable = ["Q3", "Q1", "Q2"]
            .iter()
            .map(|q| Node::new(id(q), *q, "Entity"))
            .collect();
        let order: Vec<&str> = table.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["Q3", "Q1", "Q2"]);
    }

    #[test]
    fn test_ordered_edges_keep_duplicates() {
        let mut edges = EdgeCollection::new(EdgeStrategy::Ordered);
        assert!(edges.add(Edge::new(id("Q1"), id("Q2"), "has cause")));
        assert!(edges.add(Edge::new(id("Q1"), id("Q2"), "immediate cause of")));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_unique_pairs_drop_relation_distinctions() {
        let mut edges = EdgeCollection::new(EdgeStrategy::UniquePairs);
        assert!(edges.add(Edge::new(id("Q1"), id("Q2"), "has cause")));
        assert!(!edges.add(Edge::new(id("Q1"), id("Q2"), "immediate cause of")));
        assert!(edges.add(Edge::new(id("Q2"), id("Q1"), "has cause")));
        assert_eq!(edges.len(), 2);
        assert_eq!(edges.iter().next().unwrap().relation, "has cause");
    }

    #[test]
    fn test_unique_pairs_equality_ignores_order() {
        let a = EdgeCollection::from_edges(
            EdgeStrategy::UniquePairs,
            vec![Edge::new(id("Q1"), id("Q2"), "INFLUENCED"), Edge::new(id("Q3"), id("Q4"), "INFLUENCED")],
        );
        let b = EdgeCollection::from_edges(
            EdgeStrategy::UniquePairs,
            vec![Edge::new(id("Q3"), id("Q4"), "INFLUENCED"), Edge::new(id("Q1"), id("Q2"), "INFLUENCED")],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_edge_strategy_parse() {
        assert_eq!("set".parse::<EdgeStrategy>().unwrap(), EdgeStrategy::UniquePairs);
        assert_eq!("Ordered".parse::<EdgeStrategy>().unwrap(), EdgeStrategy::Ordered);
        assert!("bag".parse::<EdgeStrategy>().is_err());
    }
}
