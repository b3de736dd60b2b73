//! Checkpoint persistence
//!
//! A checkpoint with tag `T` is three files in the checkpoint directory:
//!
//! ```text
//! nodes_T.csv         node table, same columns as the final output
//! edges_T.csv         edge collection, same columns as the final output
//! checkpoint_T.json   manifest: next offset, counts, edge strategy, creation time
//! ```
//!
//! The manifest is written last, so its presence marks a complete checkpoint. Older
//! checkpoints without a manifest are still loadable; their resume offset is the tag.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ResumePoint;
use crate::core::{EdgeCollection, EdgeStrategy, NodeTable, PipelineState};
use crate::error::{Error, Result};
use crate::tabular;

/// Type tag given to checkpointed nodes whose table has no type column.
const FALLBACK_TYPE_TAG: &str = "Entity";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub tag: u64,
    pub next_offset: u64,
    pub nodes: usize,
    pub edges: usize,
    pub edge_strategy: EdgeStrategy,
    /// Seconds since the Unix epoch
    pub created_at: u64,
}

/// Paths making up one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointLocation {
    pub tag: u64,
    pub nodes: PathBuf,
    pub edges: PathBuf,
    pub manifest: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Use `dir` for checkpoints, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn location(&self, tag: u64) -> CheckpointLocation {
        CheckpointLocation {
            tag,
            nodes: self.dir.join(format!("nodes_{}.csv", tag)),
            edges: self.dir.join(format!("edges_{}.csv", tag)),
            manifest: self.dir.join(format!("checkpoint_{}.json", tag)),
        }
    }

    /// Persist the full node table and edge collection under `tag`. An existing checkpoint
    /// with the same tag is replaced.
    pub fn save(&self, state: &PipelineState, tag: u64) -> Result<CheckpointLocation> {
        let location = self.location(tag);

        let nodes = tabular::write_nodes(&location.nodes, state.nodes.iter())?;
        let edges = tabular::write_edges(&location.edges, state.edges.iter())?;

        let manifest = CheckpointManifest {
            tag,
            next_offset: state.next_offset,
            nodes,
            edges,
            edge_strategy: state.edges.strategy(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };
        tabular::write_atomically(&location.manifest, |out| {
            serde_json::to_writer_pretty(&mut *out, &manifest)?;
            Ok(())
        })?;

        tracing::info!(
            tag,
            next_offset = state.next_offset,
            nodes,
            edges,
            path = %location.manifest.display(),
            "checkpoint saved"
        );
        Ok(location)
    }

    /// Manifest of checkpoint `tag`, `None` for checkpoints written without one.
    pub fn manifest(&self, tag: u64) -> Result<Option<CheckpointManifest>> {
        let path = self.location(tag).manifest;
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&text).map_err(|e| {
            Error::Checkpoint(format!("unreadable manifest {}: {}", path.display(), e))
        })?;
        Ok(Some(manifest))
    }

    /// Rebuild the pipeline state saved under `tag`, collecting edges with `strategy`.
    pub fn load(&self, tag: u64, strategy: EdgeStrategy) -> Result<PipelineState> {
        let location = self.location(tag);
        if !location.nodes.exists() || !location.edges.exists() {
            return Err(Error::Checkpoint(format!(
                "checkpoint {} not found in {}",
                tag,
                self.dir.display()
            )));
        }

        let manifest = self.manifest(tag)?;
        if let Some(saved) = manifest.as_ref().map(|m| m.edge_strategy) {
            if saved != strategy {
                tracing::warn!(tag, saved = %saved, requested = %strategy, "edge strategy differs from checkpoint");
            }
        }

        let nodes: NodeTable =
            tabular::read_nodes(&location.nodes, FALLBACK_TYPE_TAG)?.into_iter().collect();
        let edges = EdgeCollection::from_edges(strategy, tabular::read_edges(&location.edges)?);
        let next_offset = manifest.map_or(tag, |m| m.next_offset);

        tracing::info!(tag, next_offset, nodes = nodes.len(), edges = edges.len(), "checkpoint loaded");
        Ok(PipelineState { nodes, edges, next_offset })
    }

    /// Tags of every complete checkpoint (tables and manifest all present), ascending.
    ///
    /// A checkpoint without a manifest may have been cut short between its edge table and
    /// its manifest, so it is only reachable through an explicit [`ResumePoint::Tag`].
    pub fn tags(&self) -> Result<Vec<u64>> {
        let mut tags = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(tag) = name
                .to_str()
                .and_then(|n| n.strip_prefix("checkpoint_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok())
            else {
                continue;
            };
            let location = self.location(tag);
            if location.nodes.exists() && location.edges.exists() {
                tags.push(tag);
            }
        }
        tags.sort_unstable();
        Ok(tags)
    }

    /// Highest complete checkpoint tag.
    pub fn latest(&self) -> Result<Option<u64>> {
        Ok(self.tags()?.last().copied())
    }

    pub fn resolve(&self, point: ResumePoint) -> Result<u64> {
        match point {
            ResumePoint::Tag(tag) => Ok(tag),
            ResumePoint::Latest => self.latest()?.ok_or_else(|| {
                Error::Checkpoint(format!("no checkpoints in {}", self.dir.display()))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Edge, EntityId, Node};
    use tempfile::TempDir;

    fn id(s: &str) -> EntityId {
        EntityId::new(s).unwrap()
    }

    fn state(strategy: EdgeStrategy) -> PipelineState {
        let mut state = PipelineState::new(strategy);
        state.nodes.upsert(Node::new(id("Q1"), "A", "Entity"));
        state.nodes.upsert(Node::new(id("Q2"), "B", "Entity"));
        state.edges.add(Edge::new(id("Q1"), id("Q2"), "has cause"));
        state.edges.add(Edge::new(id("Q1"), id("Q2"), "immediate cause of"));
        state.next_offset = 4;
        state
    }

    #[test]
    fn test_save_writes_three_files() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let location = manager.save(&state(EdgeStrategy::Ordered), 2).unwrap();

        assert!(location.nodes.ends_with("nodes_2.csv"));
        assert!(location.edges.ends_with("edges_2.csv"));
        let manifest = manager.manifest(2).unwrap().unwrap();
        assert_eq!(manifest.next_offset, 4);
        assert_eq!(manifest.edges, 2);
        assert_eq!(manifest.edge_strategy, EdgeStrategy::Ordered);
    }

    #[test]
    fn test_round_trip_ordered() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let original = state(EdgeStrategy::Ordered);
        manager.save(&original, 2).unwrap();
        assert_eq!(manager.load(2, EdgeStrategy::Ordered).unwrap(), original);
    }

    #[test]
    fn test_missing_manifest_uses_tag_as_offset() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let location = manager.save(&state(EdgeStrategy::Ordered), 2).unwrap();
        fs::remove_file(location.manifest).unwrap();

        let loaded = manager.load(2, EdgeStrategy::Ordered).unwrap();
        assert_eq!(loaded.next_offset, 2);
        assert_eq!(loaded.node_count(), 2);
    }

    #[test]
    fn test_load_unknown_tag() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert!(matches!(manager.load(7, EdgeStrategy::Ordered), Err(Error::Checkpoint(_))));
    }

    #[test]
    fn test_latest_and_resolve() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert_eq!(manager.latest().unwrap(), None);
        assert!(manager.resolve(ResumePoint::Latest).is_err());

        for tag in [10, 200, 30] {
            manager.save(&state(EdgeStrategy::Ordered), tag).unwrap();
        }
        fs::write(dir.path().join("nodes_999.csv"), "id:ID,label,:LABEL\n").unwrap();

        assert_eq!(manager.tags().unwrap(), vec![10, 30, 200]);
        assert_eq!(manager.resolve(ResumePoint::Latest).unwrap(), 200);
        assert_eq!(manager.resolve(ResumePoint::Tag(30)).unwrap(), 30);
    }

    #[test]
    fn test_latest_skips_checkpoint_without_manifest() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();

        let mut first = state(EdgeStrategy::Ordered);
        first.next_offset = 4;
        manager.save(&first, 1).unwrap();
        let mut second = state(EdgeStrategy::Ordered);
        second.next_offset = 8;
        let cut_short = manager.save(&second, 2).unwrap();
        fs::remove_file(cut_short.manifest).unwrap();

        assert_eq!(manager.tags().unwrap(), vec![1]);
        let tag = manager.resolve(ResumePoint::Latest).unwrap();
        assert_eq!(tag, 1);
        assert_eq!(manager.load(tag, EdgeStrategy::Ordered).unwrap().next_offset, 4);

        // Still loadable when asked for by tag
        assert_eq!(manager.resolve(ResumePoint::Tag(2)).unwrap(), 2);
        assert_eq!(manager.load(2, EdgeStrategy::Ordered).unwrap().next_offset, 2);
    }
}
