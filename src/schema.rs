//! Schema configuration
//!
//! The schema file declares which node types exist and, for every edge
//! type, the node types it connects. Entries look like:
//!
//! ```yaml
//! gene:
//!   represented_as: node
//!   input_label: gene
//!   is_a: biological entity
//! transcribed to:
//!   represented_as: edge
//!   input_label: transcribed_to
//!   source: transcript
//!   target: gene
//! ```

use crate::identifier::normalize_label;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed schema: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid schema entry {entry}: {reason}")]
    InvalidEntry { entry: String, reason: String },
}

/// A string or a list of strings; lists contribute their first element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn first(&self) -> Option<&str> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.first().map(String::as_str),
        }
    }

    pub fn all(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(value) => vec![value.as_str()],
            OneOrMany::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Node,
    Edge,
}

/// One schema entry. Unknown keys (`properties`, `preferred_id`, …) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEntry {
    pub represented_as: Option<Representation>,
    pub input_label: Option<OneOrMany>,
    pub source: Option<OneOrMany>,
    pub target: Option<OneOrMany>,
    pub output_label: Option<String>,
    pub is_a: Option<OneOrMany>,
}

/// Resolved endpoint types of one edge label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeType {
    /// Normalized schema entry name
    pub edge_type: String,
    pub source_type: String,
    pub target_type: String,
    pub output_label: Option<String>,
}

impl EdgeType {
    /// Label edges of this type are stored under
    pub fn stored_label<'a>(&'a self, label: &'a str) -> &'a str {
        self.output_label.as_deref().unwrap_or(label)
    }
}

/// Lowercase edge label → endpoint types
#[derive(Debug, Clone, Default)]
pub struct EdgeTypeTable {
    types: BTreeMap<String, EdgeType>,
}

impl EdgeTypeTable {
    pub fn get(&self, label: &str) -> Option<&EdgeType> {
        self.types.get(&label.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EdgeType)> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A loaded schema, entries in document order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<(String, SchemaEntry)>,
}

impl Schema {
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mapping: Option<serde_yaml::Mapping> = serde_yaml::from_str(content)?;

        let mut entries = Vec::new();
        for (key, value) in mapping.unwrap_or_default() {
            let name = key.as_str().map(str::to_string).ok_or_else(|| SchemaError::InvalidEntry {
                entry: format!("{:?}", key),
                reason: "entry names must be strings".to_string(),
            })?;
            // Free-form top-level keys (e.g. `Title`) are not entries
            if !value.is_mapping() {
                continue;
            }
            let entry: SchemaEntry =
                serde_yaml::from_value(value).map_err(|e| SchemaError::InvalidEntry {
                    entry: name.clone(),
                    reason: e.to_string(),
                })?;
            entries.push((name, entry));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, SchemaEntry)] {
        &self.entries
    }

    fn entries_of(&self, kind: Representation) -> impl Iterator<Item = &(String, SchemaEntry)> {
        self.entries
            .iter()
            .filter(move |(_, entry)| entry.represented_as == Some(kind))
    }

    /// Edge-type table. Edge entries without both `source` and `target`
    /// are left out.
    pub fn edge_types(&self) -> EdgeTypeTable {
        let mut types = BTreeMap::new();

        for (name, entry) in self.entries_of(Representation::Edge) {
            let (Some(source), Some(target)) = (
                entry.source.as_ref().and_then(OneOrMany::first),
                entry.target.as_ref().and_then(OneOrMany::first),
            ) else {
                continue;
            };
            let label = entry
                .input_label
                .as_ref()
                .and_then(OneOrMany::first)
                .unwrap_or(name.as_str());

            types.insert(
                normalize_label(label),
                EdgeType {
                    edge_type: normalize_label(name),
                    source_type: normalize_label(source),
                    target_type: normalize_label(target),
                    output_label: entry.output_label.as_deref().map(normalize_label),
                },
            );
        }

        EdgeTypeTable { types }
    }

    /// Normalized input labels of every node entry
    pub fn node_types(&self) -> BTreeSet<String> {
        self.node_labels().into_iter().map(|(_, label)| label).collect()
    }

    /// `(node type, input label)` pairs, normalized, in document order
    pub fn node_labels(&self) -> Vec<(String, String)> {
        self.entries_of(Representation::Node)
            .flat_map(|(name, entry)| {
                let labels = match &entry.input_label {
                    Some(labels) => labels.all(),
                    None => vec![name.as_str()],
                };
                labels
                    .into_iter()
                    .map(|label| (normalize_label(name), normalize_label(label)))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// `(type, parent)` for every entry; `None` marks a root type.
    ///
    /// Parents named by `is_a` that have no entry of their own are listed
    /// first as roots.
    pub fn type_hierarchy(&self) -> Vec<(String, Option<String>)> {
        let declared: BTreeSet<String> = self
            .entries
            .iter()
            .map(|(name, _)| normalize_label(name))
            .collect();

        let mut roots: Vec<String> = Vec::new();
        let mut hierarchy = Vec::new();
        for (name, entry) in &self.entries {
            let parent = entry
                .is_a
                .as_ref()
                .and_then(OneOrMany::first)
                .map(normalize_label);
            if let Some(parent) = &parent {
                if !declared.contains(parent) && !roots.contains(parent) {
                    roots.push(parent.clone());
                }
            }
            hierarchy.push((normalize_label(name), parent));
        }

        roots
            .into_iter()
            .map(|root| (root, None))
            .chain(hierarchy)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
Title: test schema
gene:
  represented_as: node
  input_label: gene
  is_a: biological entity
transcript:
  represented_as: node
  input_label: [transcript, rna transcript]
gene ontology term:
  represented_as: node
  input_label: go
  is_a: ontology term
transcribed to:
  represented_as: edge
  input_label: transcribed_to
  source: transcript
  target: gene
gene to go:
  represented_as: edge
  input_label: [gene_go, gene_go_alt]
  source: [gene]
  target: [ontology_term]
  output_label: belongs_to
dangling:
  represented_as: edge
  input_label: dangling
  source: gene
"#;

    #[test]
    fn edge_table_uses_first_input_label() {
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        let table = schema.edge_types();

        assert_eq!(table.len(), 2);
        let go = table.get("GENE_GO").unwrap();
        assert_eq!(go.source_type, "gene");
        assert_eq!(go.target_type, "ontology_term");
        assert_eq!(go.stored_label("gene_go"), "belongs_to");
        assert_eq!(go.edge_type, "gene_to_go");

        let transcribed = table.get("transcribed_to").unwrap();
        assert_eq!(transcribed.stored_label("transcribed_to"), "transcribed_to");
        assert!(table.get("dangling").is_none());
    }

    #[test]
    fn node_types_include_every_input_label() {
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        let types = schema.node_types();
        assert!(types.contains("gene"));
        assert!(types.contains("rna_transcript"));
        assert!(types.contains("go"));
        assert!(!types.contains("transcribed_to"));
    }

    #[test]
    fn hierarchy_lists_undeclared_parents_as_roots() {
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        let hierarchy = schema.type_hierarchy();
        assert_eq!(hierarchy[0], ("biological_entity".to_string(), None));
        assert_eq!(hierarchy[1], ("ontology_term".to_string(), None));
        assert!(hierarchy.contains(&("gene".to_string(), Some("biological_entity".to_string()))));
        assert!(hierarchy.contains(&("transcript".to_string(), None)));
    }

    #[test]
    fn invalid_entry_is_reported_by_name() {
        let err = Schema::from_yaml_str("gene:\n  represented_as: vertex\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEntry { entry, .. } if entry == "gene"));
    }
}
