//! Integration tests for cleaning and graph import
//!
//! Writes raw extraction tables to a temporary data directory, cleans them, and loads the
//! cleaned output into a [`GraphStore`].

use causeway::cleaning::{clean_directory, CleaningOptions};
use causeway::core::EntityId;
use causeway::graph::{import_directory, GraphStore};
use causeway::Error;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HUMANS: &str = "\
id:ID,label,:LABEL,birth_date
Q1,Ada Lovelace,Human,1815-12-10T00:00:00Z
Q2,Q2,Human,
Q7,Charles Babbage,Human,1791-12-26T00:00:00Z
";

const GROUPS: &str = "\
id:ID,label,:LABEL,genre
Q3,The Beatles,MusicalGroup,rock music
L5,lexeme,MusicalGroup,
";

// Older entity tables have no type column and call the label `name`
const ART: &str = "\
id:ID,name
Q1,Ada Lovelace
Q9,Q9
";

const RELATIONSHIPS: &str = "\
:START_ID,:END_ID,:TYPE
Q1,Q3,INFLUENCED
Q1,Q2,INFLUENCED
Q3,L5,INFLUENCED
Q7,Q1,INFLUENCED
Q8,Q1,INFLUENCED
";

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// Data directory holding three node tables and one relationship table
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "humans.csv", HUMANS);
    write(dir.path(), "musical_groups.csv", GROUPS);
    write(dir.path(), "art.csv", ART);
    write(dir.path(), "relationships.csv", RELATIONSHIPS);
    dir
}

fn id(q: &str) -> EntityId {
    EntityId::new(q).unwrap()
}

#[test]
fn test_clean_directory() {
    let dir = data_dir();

    let report = clean_directory(dir.path(), &CleaningOptions::default()).unwrap();

    let names: Vec<_> = report
        .node_files
        .iter()
        .map(|f| f.output.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["art_cleaned.csv", "humans_cleaned.csv", "musical_groups_cleaned.csv"]);
    assert_eq!(report.nodes_kept(), 5);
    assert_eq!(report.nodes_removed(), 2);

    let humans = fs::read_to_string(dir.path().join("humans_cleaned.csv")).unwrap();
    assert_eq!(
        humans,
        "id:ID,label,:LABEL,birth_date\n\
         Q1,Ada Lovelace,Human,1815-12-10T00:00:00Z\n\
         Q7,Charles Babbage,Human,1791-12-26T00:00:00Z\n"
    );

    // The legacy table gains the canonical header and the fallback type
    let art = fs::read_to_string(dir.path().join("art_cleaned.csv")).unwrap();
    assert_eq!(art, "id:ID,label,:LABEL\nQ1,Ada Lovelace,Entity\n");

    let rels = report.relationships.unwrap();
    assert_eq!(rels.kept, 3);
    assert_eq!(rels.removed, 2);
    let text = fs::read_to_string(dir.path().join("relationships_cleaned.csv")).unwrap();
    assert_eq!(
        text,
        ":START_ID,:END_ID,:TYPE\nQ1,Q3,INFLUENCED\nQ3,L5,INFLUENCED\nQ7,Q1,INFLUENCED\n"
    );
}

#[test]
fn test_clean_directory_require_qid() {
    let dir = data_dir();
    let options = CleaningOptions { require_qid: true, ..Default::default() };

    let report = clean_directory(dir.path(), &options).unwrap();

    assert_eq!(report.nodes_kept(), 4);
    assert_eq!(report.relationships.unwrap().kept, 2);
}

#[test]
fn test_clean_directory_is_rerunnable() {
    let dir = data_dir();
    let first = clean_directory(dir.path(), &CleaningOptions::default()).unwrap();
    let second = clean_directory(dir.path(), &CleaningOptions::default()).unwrap();

    assert_eq!(first, second);
    assert!(!dir.path().join("humans_cleaned_cleaned.csv").exists());
}

#[test]
fn test_clean_missing_directory() {
    let dir = TempDir::new().unwrap();
    let result = clean_directory(&dir.path().join("absent"), &CleaningOptions::default());
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_clean_then_import() {
    let dir = data_dir();
    clean_directory(dir.path(), &CleaningOptions::default()).unwrap();

    let (graph, report) = import_directory(dir.path(), "relationships.csv").unwrap();

    assert_eq!(report.node_files.len(), 3);
    assert_eq!(report.nodes, 5);
    assert_eq!(report.edges, 3);
    assert_eq!(report.edges_skipped, 0);
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);

    // Q1 appears in two tables and carries both tags
    let ada = graph.entity(&id("Q1")).unwrap();
    assert_eq!(ada.tags, vec!["Entity".to_string(), "Human".to_string()]);
    assert_eq!(ada.properties.get("birth_date").map(String::as_str), Some("1815-12-10T00:00:00Z"));

    let hood = graph.neighbors(&id("Q1")).unwrap();
    assert_eq!(hood.outgoing.len(), 1);
    assert_eq!(hood.outgoing[0].label, "The Beatles");
    assert_eq!(hood.incoming.len(), 1);
    assert_eq!(hood.incoming[0].id, id("Q7"));

    let stats = graph.stats();
    assert_eq!(stats.tags.get("Human"), Some(&2));
    assert_eq!(stats.tags.get("MusicalGroup"), Some(&2));
    assert_eq!(stats.relations.get("INFLUENCED"), Some(&3));
}

#[test]
fn test_import_rejects_duplicate_rows() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "humans_cleaned.csv",
        "id:ID,label,:LABEL\nQ1,Ada Lovelace,Human\nQ1,Augusta Ada King,Human\n",
    );

    let result = import_directory(dir.path(), "relationships.csv");
    assert!(matches!(result, Err(Error::Constraint(_))));
}

#[test]
fn test_import_skips_dangling_edges() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "humans_cleaned.csv", "id:ID,label,:LABEL\nQ1,Ada Lovelace,Human\n");
    write(
        dir.path(),
        "relationships_cleaned.csv",
        ":START_ID,:END_ID,:TYPE\nQ1,Q2,INFLUENCED\n",
    );

    let (graph, report) = import_directory(dir.path(), "relationships.csv").unwrap();
    assert_eq!(report.edges, 0);
    assert_eq!(report.edges_skipped, 1);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_malformed_table() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "humans_cleaned.csv", "identifier,label\nQ1,Ada\n");

    let mut graph = GraphStore::new();
    let result = graph.import_nodes(&dir.path().join("humans_cleaned.csv"));
    assert!(matches!(result, Err(Error::Table { .. })));
}
