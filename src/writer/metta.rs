//! MeTTa symbolic sink
//!
//! `type_defs.metta` is written once from the schema; node and edge atoms
//! are appended per adapter to `<adapter>/nodes.metta` and
//! `<adapter>/edges.metta`.

use super::sink::{Record, Sink, SinkResult};
use crate::graph::{Properties, PropertyValue};
use crate::identifier::{is_url, normalize_curie};
use crate::schema::Schema;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Property rendered as an ontology term atom
const BIOLOGICAL_CONTEXT: &str = "biological_context";

pub struct MettaSink {
    output_dir: PathBuf,
}

impl MettaSink {
    /// Create the output directory and write the type definitions.
    pub fn create(output_dir: impl Into<PathBuf>, schema: &Schema) -> SinkResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;

        let lines = type_definitions(schema);
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(output_dir.join("type_defs.metta"), content)?;
        info!(dir = %output_dir.display(), definitions = lines.len(), "Wrote MeTTa type definitions");

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn type_definitions(schema: &Schema) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, parent) in schema.type_hierarchy() {
        match parent {
            Some(parent) if parent != name => {
                lines.push(format!("(<: {} {})", name.to_uppercase(), parent.to_uppercase()))
            }
            _ => lines.push(format!("(: {} Type)", name.to_uppercase())),
        }
    }
    for (label, edge_type) in schema.edge_types().iter() {
        lines.push(format!(
            "(: {} (-> {} {} {}))",
            label,
            edge_type.source_type.to_uppercase(),
            edge_type.target_type.to_uppercase(),
            edge_type.edge_type.to_uppercase()
        ));
    }
    for (node_type, label) in schema.node_labels() {
        lines.push(format!("(: {} (-> $x {}))", label, node_type.to_uppercase()));
    }
    lines
}

/// Atom-safe rendering of a property value.
///
/// URLs are kept as they are. Other strings have spaces turned into `_`
/// (leading and trailing `_` trimmed) and `(`, `)`, `\` escaped.
pub fn check_property(value: &PropertyValue) -> String {
    let PropertyValue::String(s) = value else {
        return value.to_string();
    };
    if is_url(s) {
        return s.trim().to_string();
    }
    let s = if s.contains(' ') {
        s.replace(' ', "_").trim_matches('_').to_string()
    } else {
        s.clone()
    };
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The head atom followed by one atom per property
pub fn property_atoms(head: &str, properties: &Properties) -> Vec<String> {
    let mut atoms = vec![head.to_string()];
    append_properties(&mut atoms, head, properties);
    atoms
}

fn append_properties(atoms: &mut Vec<String>, head: &str, properties: &Properties) {
    for (key, value) in properties {
        if value.is_null() || value.as_str() == Some("") {
            continue;
        }
        match value {
            PropertyValue::Array(items) => {
                let items: Vec<String> = items.iter().map(check_property).collect();
                atoms.push(format!("({} {} ({}))", key, head, items.join(" ")));
            }
            PropertyValue::Object(nested) => {
                let nested_head = format!("({} {})", key, head);
                atoms.push(nested_head.clone());
                append_properties(atoms, &nested_head, nested);
            }
            _ if key == BIOLOGICAL_CONTEXT => {
                let term = check_property(value).to_uppercase().replace('_', ":");
                let ontology = term.split(':').next().unwrap_or_default().to_lowercase();
                atoms.push(format!("({} {} ({} {}))", key, head, ontology, term));
            }
            _ => atoms.push(format!("({} {} {})", key, head, check_property(value))),
        }
    }
}

fn record_atoms(record: &Record) -> Vec<String> {
    match record {
        Record::Node(node) => {
            let head = format!("({} {})", node.label, node.id);
            property_atoms(&head, &node.properties)
        }
        Record::Edge(edge) => {
            let head = format!(
                "({} ({} {}) ({} {}))",
                edge.label, edge.source_type, edge.source_id, edge.target_type, edge.target_id
            );
            property_atoms(&head, &edge.properties)
        }
    }
}

impl Sink for MettaSink {
    fn insert_batch(&mut self, adapter: &str, _collection: &str, records: Vec<Record>) -> SinkResult<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let file_name = match first {
            Record::Node(_) => "nodes.metta",
            Record::Edge(_) => "edges.metta",
        };
        let dir = self.output_dir.join(adapter);
        std::fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(file_name))?;

        let mut out = BufWriter::new(file);
        for record in &records {
            for atom in record_atoms(record) {
                writeln!(out, "{}", atom)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn normalize_id(&self, id: &str) -> String {
        normalize_curie(id)
    }

    fn normalize_value(&self, value: &PropertyValue) -> PropertyValue {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::sink::{EdgeRecord, NodeRecord};
    use std::collections::BTreeMap;

    const SCHEMA: &str = r#"
gene:
  represented_as: node
  input_label: gene
  is_a: biological entity
transcript:
  represented_as: node
  input_label: transcript
  is_a: gene
transcribed to:
  represented_as: edge
  input_label: transcribed_to
  source: transcript
  target: gene
"#;

    #[test]
    fn type_defs_are_written_from_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        MettaSink::create(dir.path(), &schema).unwrap();

        let defs = std::fs::read_to_string(dir.path().join("type_defs.metta")).unwrap();
        let lines: Vec<&str> = defs.lines().collect();
        assert_eq!(lines[0], "(: BIOLOGICAL_ENTITY Type)");
        assert!(lines.contains(&"(<: GENE BIOLOGICAL_ENTITY)"));
        assert!(lines.contains(&"(<: TRANSCRIPT GENE)"));
        assert!(lines.contains(&"(: transcribed_to (-> TRANSCRIPT GENE TRANSCRIBED_TO))"));
        assert!(lines.contains(&"(: gene (-> $x GENE))"));
    }

    #[test]
    fn check_property_escapes_and_keeps_urls() {
        assert_eq!(check_property(&"Some Value (weird)".into()), r"Some_Value_\(weird\)");
        assert_eq!(check_property(&" padded ".into()), "padded");
        let url = "https://example.com/some?query=1&x=2";
        assert_eq!(check_property(&url.into()), url);
        assert_eq!(check_property(&PropertyValue::Int(7)), "7");
    }

    #[test]
    fn property_atoms_cover_lists_objects_and_context() {
        let mut nested = BTreeMap::new();
        nested.insert("score".to_string(), PropertyValue::Float(0.5));
        let mut properties = Properties::new();
        properties.insert("synonyms".to_string(), PropertyValue::Array(vec!["A 1".into(), "B".into()]));
        properties.insert("evidence".to_string(), PropertyValue::Object(nested));
        properties.insert("biological_context".to_string(), "uberon_0002107".into());
        properties.insert("empty".to_string(), "".into());

        let atoms = property_atoms("(gene ENSEMBL:ensg1)", &properties);
        assert_eq!(
            atoms,
            vec![
                "(gene ENSEMBL:ensg1)",
                "(biological_context (gene ENSEMBL:ensg1) (uberon UBERON:0002107))",
                "(evidence (gene ENSEMBL:ensg1))",
                "(score (evidence (gene ENSEMBL:ensg1)) 0.5)",
                "(synonyms (gene ENSEMBL:ensg1) (A_1 B))",
            ]
        );
    }

    #[test]
    fn batches_are_appended_per_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        let mut sink = MettaSink::create(dir.path(), &schema).unwrap();

        let node = |id: &str| {
            Record::Node(NodeRecord {
                id: sink_id(id),
                label: "gene".to_string(),
                properties: Properties::new(),
            })
        };
        sink.insert_batch("genes", "nodes_gene", vec![node("ENSEMBL:ENSG1")]).unwrap();
        sink.insert_batch("genes", "nodes_gene", vec![node("ENSEMBL:ENSG2")]).unwrap();
        sink.insert_batch(
            "genes",
            "edges_transcribed_to",
            vec![Record::Edge(EdgeRecord {
                source_id: sink_id("ENSEMBL:ENST1"),
                source_type: "transcript".to_string(),
                target_id: sink_id("ENSEMBL:ENSG1"),
                target_type: "gene".to_string(),
                label: "transcribed_to".to_string(),
                properties: Properties::new(),
            })],
        )
        .unwrap();

        let nodes = std::fs::read_to_string(dir.path().join("genes").join("nodes.metta")).unwrap();
        assert_eq!(nodes, "(gene ENSEMBL:ensg1)\n(gene ENSEMBL:ensg2)\n");
        let edges = std::fs::read_to_string(dir.path().join("genes").join("edges.metta")).unwrap();
        assert_eq!(
            edges,
            "(transcribed_to (transcript ENSEMBL:enst1) (gene ENSEMBL:ensg1))\n"
        );
    }

    fn sink_id(id: &str) -> String {
        normalize_curie(id)
    }
}
