//! Neo4j CSV + Cypher sink
//!
//! Records are staged per adapter and written on `flush`: one `|`-delimited
//! CSV per node label and per `(label, source type, target type)` edge
//! group, each with a Cypher script that loads it through
//! `apoc.periodic.iterate`.

use super::sink::{Record, Sink, SinkResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

const DELIMITER: u8 = b'|';

/// Node labels that also get the `:ontology_term` label
const ONTOLOGIES: [&str; 6] = ["go", "bto", "efo", "cl", "clo", "uberon"];

type EdgeGroup = (String, String, String);

#[derive(Default)]
struct Staged {
    nodes: BTreeMap<String, Vec<Map<String, Value>>>,
    edges: BTreeMap<EdgeGroup, Vec<Map<String, Value>>>,
}

pub struct Neo4jCsvSink {
    output_dir: PathBuf,
    staged: BTreeMap<String, Staged>,
}

impl Neo4jCsvSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> SinkResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            staged: BTreeMap::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Header row: `id` first when present, the rest sorted.
fn headers(rows: &[Map<String, Value>]) -> Vec<String> {
    let keys: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();
    let mut headers: Vec<String> = Vec::with_capacity(keys.len());
    if keys.iter().any(|key| key.as_str() == "id") {
        headers.push("id".to_string());
    }
    headers.extend(keys.into_iter().filter(|key| key.as_str() != "id").cloned());
    headers
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_csv(path: &Path, rows: &[Map<String, Value>]) -> SinkResult<()> {
    let headers = headers(rows);
    let mut writer = csv::WriterBuilder::new().delimiter(DELIMITER).from_path(path)?;
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|header| cell(row.get(header))))?;
    }
    writer.flush()?;
    Ok(())
}

fn absolute(path: &Path) -> SinkResult<String> {
    Ok(std::fs::canonicalize(path)?.to_string_lossy().replace('\\', "/"))
}

fn node_cypher(label: &str, csv_path: &str) -> String {
    let extra = if ONTOLOGIES.contains(&label) { ":ontology_term" } else { "" };
    let delimiter = DELIMITER as char;
    format!(
        r#"
CREATE CONSTRAINT IF NOT EXISTS FOR (n:{label}) REQUIRE n.id IS UNIQUE;

CALL apoc.periodic.iterate(
    "LOAD CSV WITH HEADERS FROM 'file:///{csv_path}' AS row FIELDTERMINATOR '{delimiter}' RETURN row",
    "MERGE (n:{label}{extra} {{id: row.id}})
    SET n += apoc.map.removeKeys(row, ['id'])",
    {{batchSize:1000, parallel:true, concurrency:4}}
)
YIELD batches, total
RETURN batches, total;
"#
    )
}

fn edge_cypher(label: &str, source_type: &str, target_type: &str, csv_path: &str) -> String {
    let delimiter = DELIMITER as char;
    format!(
        r#"
CALL apoc.periodic.iterate(
    "LOAD CSV WITH HEADERS FROM 'file:///{csv_path}' AS row FIELDTERMINATOR '{delimiter}' RETURN row",
    "MATCH (source:{source_type} {{id: row.source_id}})
    MATCH (target:{target_type} {{id: row.target_id}})
    MERGE (source)-[r:{label}]->(target)
    SET r += apoc.map.removeKeys(row, ['source_id', 'target_id', 'label', 'source_type', 'target_type'])",
    {{batchSize:1000}}
)
YIELD batches, total
RETURN batches, total;
"#
    )
}

impl Sink for Neo4jCsvSink {
    fn insert_batch(&mut self, adapter: &str, _collection: &str, records: Vec<Record>) -> SinkResult<()> {
        let staged = self.staged.entry(adapter.to_string()).or_default();
        for record in records {
            let mut document = record.to_document();
            match &record {
                Record::Node(node) => {
                    document.insert("label".to_string(), Value::String(node.label.clone()));
                    staged.nodes.entry(node.label.clone()).or_default().push(document);
                }
                Record::Edge(edge) => {
                    let group = (edge.label.clone(), edge.source_type.clone(), edge.target_type.clone());
                    staged.edges.entry(group).or_default().push(document);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self, adapter: &str) -> SinkResult<()> {
        let Some(staged) = self.staged.remove(adapter) else {
            return Ok(());
        };
        let dir = self.output_dir.join(adapter);
        std::fs::create_dir_all(&dir)?;

        for (label, rows) in &staged.nodes {
            let csv_path = dir.join(format!("nodes_{}.csv", label));
            write_csv(&csv_path, rows)?;
            let cypher = node_cypher(label, &absolute(&csv_path)?);
            std::fs::write(dir.join(format!("nodes_{}.cypher", label)), cypher)?;
        }

        for ((label, source_type, target_type), rows) in &staged.edges {
            let suffix = format!("{}_{}_{}", label, source_type, target_type).to_lowercase();
            let csv_path = dir.join(format!("edges_{}.csv", suffix));
            write_csv(&csv_path, rows)?;
            let cypher = edge_cypher(label, source_type, target_type, &absolute(&csv_path)?);
            std::fs::write(dir.join(format!("edges_{}.cypher", suffix)), cypher)?;
        }

        info!(
            adapter,
            node_files = staged.nodes.len(),
            edge_files = staged.edges.len(),
            dir = %dir.display(),
            "Wrote Neo4j import files"
        );
        Ok(())
    }
}
