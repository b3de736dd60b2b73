//! Cleaning of extracted tables before import
//!
//! Nodes whose label is just their identifier never had a label resolved and are dropped;
//! so, optionally, are nodes whose identifier is not a `Q<digits>` item id. Relationships
//! are then filtered against the ids that survived in any node table.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Edge, EntityId, Node};
use crate::error::{Error, Result};
use crate::tabular;

/// Suffix appended to the stem of every cleaned table.
pub const CLEANED_SUFFIX: &str = "_cleaned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningOptions {
    /// Also drop nodes whose id is not a Wikidata item id
    pub require_qid: bool,
    /// Name of the relationship table inside the directory
    pub relationships_file: String,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self { require_qid: false, relationships_file: "relationships.csv".to_string() }
    }
}

/// Outcome for one cleaned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub kept: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub node_files: Vec<FileReport>,
    /// `None` when the directory has no relationship table
    pub relationships: Option<FileReport>,
}

impl CleaningReport {
    pub fn nodes_kept(&self) -> usize {
        self.node_files.iter().map(|f| f.kept).sum()
    }

    pub fn nodes_removed(&self) -> usize {
        self.node_files.iter().map(|f| f.removed).sum()
    }
}

pub fn keep_node(node: &Node, options: &CleaningOptions) -> bool {
    node.has_resolved_label() && (!options.require_qid || node.id.is_qid())
}

/// Split `nodes` into the ones to keep and the number removed.
pub fn clean_nodes(nodes: Vec<Node>, options: &CleaningOptions) -> (Vec<Node>, usize) {
    let total = nodes.len();
    let kept: Vec<Node> = nodes.into_iter().filter(|n| keep_node(n, options)).collect();
    let removed = total - kept.len();
    (kept, removed)
}

/// Keep only edges whose endpoints are both in `valid_ids`.
pub fn clean_edges(edges: Vec<Edge>, valid_ids: &HashSet<EntityId>) -> (Vec<Edge>, usize) {
    let total = edges.len();
    let kept: Vec<Edge> = edges
        .into_iter()
        .filter(|e| valid_ids.contains(&e.source) && valid_ids.contains(&e.target))
        .collect();
    let removed = total - kept.len();
    (kept, removed)
}

/// `humans.csv` -> `humans_cleaned.csv`
pub fn cleaned_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    path.with_file_name(format!("{}{}.csv", stem, CLEANED_SUFFIX))
}

fn is_cleaned(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map_or(false, |s| s.ends_with(CLEANED_SUFFIX))
}

/// Clean every node table in `dir`, then the relationship table against the surviving ids.
///
/// Node tables are all `*.csv` files except the relationship table and previous
/// `*_cleaned.csv` output. Files are processed in name order.
pub fn clean_directory(dir: &Path, options: &CleaningOptions) -> Result<CleaningReport> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("data directory {}", dir.display())));
    }

    let relationships = dir.join(&options.relationships_file);
    let mut node_tables = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path.extension().map_or(false, |e| e == "csv");
        if is_csv && path != relationships && !is_cleaned(&path) {
            node_tables.push(path);
        }
    }
    node_tables.sort();

    let mut report = CleaningReport::default();
    let mut valid_ids = HashSet::new();

    for source in node_tables {
        let nodes = tabular::read_nodes(&source, "Entity")?;
        let (kept, removed) = clean_nodes(nodes, options);
        valid_ids.extend(kept.iter().map(|n| n.id.clone()));

        let output = cleaned_path(&source);
        tabular::write_nodes(&output, &kept)?;
        tracing::info!(
            file = %source.display(),
            kept = kept.len(),
            removed,
            "node table cleaned"
        );
        report.node_files.push(FileReport { source, output, kept: kept.len(), removed });
    }

    if relationships.exists() {
        let edges = tabular::read_edges(&relationships)?;
        let (kept, removed) = clean_edges(edges, &valid_ids);

        let output = cleaned_path(&relationships);
        tabular::write_edges(&output, &kept)?;
        tracing::info!(kept = kept.len(), removed, "relationship table cleaned");
        report.relationships =
            Some(FileReport { source: relationships, output, kept: kept.len(), removed });
    } else {
        tracing::warn!(file = %relationships.display(), "no relationship table to clean");
    }

    Ok(report)
}
