//! CSV table contract shared by checkpoints, final output, cleaning and import
//!
//! Node tables: `id:ID,label,:LABEL` followed by the sorted union of property names.
//! An empty cell is an absent property.
//! Edge tables: `:START_ID,:END_ID,:TYPE`.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{Edge, EntityId, Node};
use crate::error::{Error, Result};

pub const NODE_ID: &str = "id:ID";
pub const NODE_LABEL: &str = "label";
pub const NODE_TYPE: &str = ":LABEL";
pub const EDGE_START: &str = ":START_ID";
pub const EDGE_END: &str = ":END_ID";
pub const EDGE_TYPE: &str = ":TYPE";

/// Older entity tables name the label column `name`
const NODE_LABEL_ALIASES: &[&str] = &[NODE_LABEL, "name"];
const EDGE_TYPE_ALIASES: &[&str] = &[EDGE_TYPE, "type"];

/// Write `path` through a sibling temporary file renamed into place, so readers never see
/// a half-written table.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    let mut writer = BufWriter::new(File::create(&temp_path)?);
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a node table. Returns the number of rows written.
pub fn write_nodes<'a>(path: &Path, nodes: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
    let nodes: Vec<&Node> = nodes.into_iter().collect();
    let properties: BTreeSet<&str> =
        nodes.iter().flat_map(|n| n.properties.keys().map(String::as_str)).collect();

    write_atomically(path, |out| {
        let mut writer = csv::Writer::from_writer(out);

        let mut header = vec![NODE_ID, NODE_LABEL, NODE_TYPE];
        header.extend(properties.iter().copied());
        writer.write_record(&header)?;

        for node in &nodes {
            let mut row = vec![node.id.as_str(), node.label.as_str(), node.type_tag.as_str()];
            row.extend(
                properties.iter().map(|p| node.properties.get(*p).map_or("", String::as_str)),
            );
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    })?;

    Ok(nodes.len())
}

/// Write an edge table. Returns the number of rows written.
pub fn write_edges<'a>(path: &Path, edges: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
    let mut count = 0;

    write_atomically(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record([EDGE_START, EDGE_END, EDGE_TYPE])?;
        for edge in edges {
            writer.write_record([edge.source.as_str(), edge.target.as_str(), edge.relation.as_str()])?;
            count += 1;
        }
        writer.flush()?;
        Ok(())
    })?;

    Ok(count)
}

fn column(headers: &csv::StringRecord, names: &[&str], path: &Path) -> Result<usize> {
    headers.iter().position(|h| names.contains(&h)).ok_or_else(|| Error::Table {
        path: path.to_path_buf(),
        message: format!("missing column '{}'", names[0]),
    })
}

fn row_id(value: &str, path: &Path, row: usize) -> Result<EntityId> {
    EntityId::new(value).ok_or_else(|| Error::Table {
        path: path.to_path_buf(),
        message: format!("row {} has an empty identifier", row + 1),
    })
}

/// Read a node table back. Rows come back in file order.
///
/// The type column may be absent, in which case every node gets `default_type_tag`.
pub fn read_nodes(path: &Path, default_type_tag: &str) -> Result<Vec<Node>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let id_col = column(&headers, &[NODE_ID], path)?;
    let label_col = column(&headers, NODE_LABEL_ALIASES, path)?;
    let type_col = headers.iter().position(|h| h == NODE_TYPE);
    let property_cols: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != id_col && *i != label_col && Some(*i) != type_col)
        .collect();

    let mut nodes = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let id = row_id(record.get(id_col).unwrap_or_default(), path, row)?;
        let label = record.get(label_col).unwrap_or_default();
        let type_tag = type_col
            .and_then(|c| record.get(c))
            .filter(|t| !t.is_empty())
            .unwrap_or(default_type_tag);

        let node = property_cols.iter().fold(Node::new(id, label, type_tag), |node, (col, name)| {
            node.with_property(*name, record.get(*col).unwrap_or_default())
        });
        nodes.push(node);
    }

    Ok(nodes)
}

/// Read an edge table back. Rows come back in file order.
pub fn read_edges(path: &Path) -> Result<Vec<Edge>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let start_col = column(&headers, &[EDGE_START], path)?;
    let end_col = column(&headers, &[EDGE_END], path)?;
    let type_col = column(&headers, EDGE_TYPE_ALIASES, path)?;

    let mut edges = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let source = row_id(record.get(start_col).unwrap_or_default(), path, row)?;
        let target = row_id(record.get(end_col).unwrap_or_default(), path, row)?;
        edges.push(Edge::new(source, target, record.get(type_col).unwrap_or_default()));
    }

    Ok(edges)
}
