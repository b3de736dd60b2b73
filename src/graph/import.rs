//! Bulk import of cleaned tables into a [`GraphStore`]

use std::fs;
use std::path::{Path, PathBuf};

use crate::cleaning::{cleaned_path, CLEANED_SUFFIX};
use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::tabular;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub node_files: Vec<PathBuf>,
    pub nodes: usize,
    pub edges: usize,
    /// Edges dropped because an endpoint was not imported
    pub edges_skipped: usize,
}

impl GraphStore {
    /// Import one node table. Returns the number of rows imported.
    pub fn import_nodes(&mut self, path: &Path) -> Result<usize> {
        let nodes = tabular::read_nodes(path, "Entity")?;
        let count = nodes.len();
        for node in nodes {
            self.insert_node(node)?;
        }
        Ok(count)
    }

    /// Import an edge table. Returns `(imported, skipped)`.
    pub fn import_edges(&mut self, path: &Path) -> Result<(usize, usize)> {
        let mut imported = 0;
        let mut skipped = 0;
        for edge in tabular::read_edges(path)? {
            if self.insert_edge(edge) {
                imported += 1;
            } else {
                skipped += 1;
            }
        }
        Ok((imported, skipped))
    }
}

/// Load every `*_cleaned.csv` node table in `dir`, then the cleaned relationship table.
pub fn import_directory(dir: &Path, relationships_file: &str) -> Result<(GraphStore, ImportReport)> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("data directory {}", dir.display())));
    }

    let relationships = cleaned_path(&dir.join(relationships_file));
    let mut node_files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    node_files.retain(|path| {
        path != &relationships
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(&format!("{}.csv", CLEANED_SUFFIX)))
    });
    node_files.sort();

    let mut store = GraphStore::new();
    let mut report = ImportReport::default();

    for path in &node_files {
        let count = store.import_nodes(path)?;
        tracing::info!(file = %path.display(), nodes = count, "node table imported");
        report.nodes += count;
    }
    report.node_files = node_files;

    if relationships.exists() {
        let (imported, skipped) = store.import_edges(&relationships)?;
        if skipped > 0 {
            tracing::warn!(skipped, "relationships with unknown endpoints were skipped");
        }
        report.edges = imported;
        report.edges_skipped = skipped;
    } else {
        tracing::warn!(file = %relationships.display(), "no cleaned relationship table found");
    }

    tracing::info!(nodes = store.node_count(), edges = store.edge_count(), "graph loaded");
    Ok((store, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_import_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("humans_cleaned.csv"),
            "id:ID,label,:LABEL\nQ1,Plato,Human\nQ2,Aristotle,Human\n",
        )
        .unwrap();
        fs::write(dir.path().join("humans.csv"), "id:ID,label,:LABEL\nQ9,Q9,Human\n").unwrap();
        fs::write(
            dir.path().join("relationships_cleaned.csv"),
            ":START_ID,:END_ID,:TYPE\nQ1,Q2,INFLUENCED\nQ1,Q9,INFLUENCED\n",
        )
        .unwrap();

        let (store, report) = import_directory(dir.path(), "relationships.csv").unwrap();
        assert_eq!(report.node_files.len(), 1);
        assert_eq!(report.nodes, 2);
        assert_eq!(report.edges, 1);
        assert_eq!(report.edges_skipped, 1);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_duplicate_rows_violate_constraint() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("humans_cleaned.csv"),
            "id:ID,label,:LABEL\nQ1,Plato,Human\nQ1,Plato,Human\n",
        )
        .unwrap();
        let result = import_directory(dir.path(), "relationships.csv");
        assert!(matches!(result, Err(Error::Constraint(_))));
    }
}
