//! Mapping configuration: the declarative description of one source
//!
//! A mapping file says how raw rows become graph elements: column fixes
//! (`columns`), node specs (`nodes`), an edge spec (`edges`), row filters
//! (`filters`) and row transforms (`transforms`). YAML and JSON files share
//! one serde model; unknown filter ops, transform ops or coercion names make
//! the file malformed.

use crate::graph::PropertyValue;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("cannot read mapping file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed YAML mapping: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed JSON mapping: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn null_value() -> PropertyValue {
    PropertyValue::Null
}

/// Deserialize a mapping into `(key, value)` pairs, keeping document order.
fn ordered_pairs<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct PairsVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::new();
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                pairs.push((key, value));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor(PhantomData))
}

// ---------------------------------------------------------------------------
// columns
// ---------------------------------------------------------------------------

/// Target type of a column coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoerceType {
    Int,
    Float,
    Bool,
}

/// Column-level fixes applied before filtering
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Values filled in when a column is absent, null or empty
    pub defaults: BTreeMap<String, PropertyValue>,
    /// Column renames, applied in document order
    #[serde(deserialize_with = "ordered_pairs")]
    pub rename: Vec<(String, String)>,
    pub coerce: BTreeMap<String, CoerceType>,
}

// ---------------------------------------------------------------------------
// nodes / edges
// ---------------------------------------------------------------------------

/// How to build one kind of node from a row
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub id_column: Option<String>,
    pub label_column: Option<String>,
    pub label_constant: Option<String>,
    /// Allow-list of row fields copied into node properties
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default = "default_true")]
    pub format_curie: bool,
    pub id_prefix: Option<String>,
    #[serde(default = "default_true")]
    pub strip_version: bool,
    pub chr_column: Option<String>,
    pub start_column: Option<String>,
    pub end_column: Option<String>,
}

/// How to build edges from a row
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeSpec {
    pub source_column: Option<String>,
    pub target_column: Option<String>,
    pub label_column: Option<String>,
    pub label_constant: Option<String>,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default = "default_true")]
    pub format_curie: bool,
    pub source_prefix: Option<String>,
    pub target_prefix: Option<String>,
    #[serde(default = "default_true")]
    pub strip_version: bool,
}

/// Resolve a label from `label_column` (when the row has it) or the constant.
pub(crate) fn resolve_label(
    row: &BTreeMap<String, PropertyValue>,
    label_column: Option<&str>,
    label_constant: Option<&str>,
) -> Option<String> {
    label_column
        .and_then(|column| row.get(column))
        .filter(|value| !value.is_null())
        .map(|value| value.to_string())
        .or_else(|| label_constant.map(str::to_string))
        .filter(|label| !label.is_empty())
}

/// The `nodes` section: a single spec or named groups in document order.
///
/// A mapping that contains `id_column` is a single spec; any other mapping
/// is a set of named groups.
#[derive(Debug, Clone, Default)]
pub enum NodesSection {
    #[default]
    Empty,
    Single(NodeSpec),
    Groups(Vec<(String, NodeSpec)>),
}

impl NodesSection {
    /// Node specs in evaluation order
    pub fn specs(&self) -> Vec<&NodeSpec> {
        match self {
            NodesSection::Empty => Vec::new(),
            NodesSection::Single(spec) => vec![spec],
            NodesSection::Groups(groups) => groups.iter().map(|(_, spec)| spec).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.specs().is_empty()
    }
}

impl<'de> Deserialize<'de> for NodesSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let mapping = match value {
            serde_yaml::Value::Null => return Ok(NodesSection::Empty),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => return Err(de::Error::custom("`nodes` must be a mapping")),
        };

        if mapping.contains_key("id_column") {
            let spec = serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
                .map_err(de::Error::custom)?;
            return Ok(NodesSection::Single(spec));
        }

        let mut groups = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| de::Error::custom("node group names must be strings"))?
                .to_string();
            let spec = serde_yaml::from_value(value)
                .map_err(|e| de::Error::custom(format!("node group `{}`: {}", name, e)))?;
            groups.push((name, spec));
        }
        Ok(NodesSection::Groups(groups))
    }
}

// ---------------------------------------------------------------------------
// filters / transforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Equals,
    In,
    Gt,
    Lt,
}

/// Row predicate; every filter of a mapping must pass.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub op: FilterOp,
    #[serde(default = "null_value")]
    pub value: PropertyValue,
}

/// Row-level transform, applied in declared order
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum TransformSpec {
    /// String → list of trimmed parts
    Split {
        field: String,
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
    /// List → one row per element
    Explode { field: String },
    /// Join the present `parts` into `field`
    Concat {
        field: String,
        parts: Vec<String>,
        #[serde(default)]
        sep: String,
    },
    /// Exact substitution keyed by the value's string form
    Map {
        field: String,
        mapping: BTreeMap<String, PropertyValue>,
    },
    /// `{value}` template over `source` (default: `field`)
    Format {
        field: String,
        source: Option<String>,
        template: String,
    },
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A complete mapping file. Immutable once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub columns: ColumnConfig,
    pub nodes: NodesSection,
    pub edges: Option<EdgeSpec>,
    pub filters: Vec<FilterSpec>,
    pub transforms: Vec<TransformSpec>,
}

impl MappingConfig {
    /// Parse YAML text; an empty document is an empty mapping.
    pub fn from_yaml_str(content: &str) -> Result<Self, MappingError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<MappingConfig> = serde_yaml::from_str(content)?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn from_json_str(content: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Load a mapping file, choosing the parser by extension.
///
/// `.yaml`/`.yml` are YAML, `.json` is JSON; anything else is attempted as
/// YAML with a warning.
pub fn load_mapping(path: &Path) -> Result<MappingConfig, MappingError> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("yaml") | Some("yml") => MappingConfig::from_yaml_str(&content),
        Some("json") => MappingConfig::from_json_str(&content),
        _ => {
            warn!(path = %path.display(), "Unknown mapping config format, attempting YAML");
            MappingConfig::from_yaml_str(&content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_spec_is_detected_by_id_column() {
        let config = MappingConfig::from_yaml_str(
            "nodes:\n  id_column: gene_id\n  label_constant: gene\n  properties: [gene_name]\n",
        )
        .unwrap();

        let NodesSection::Single(spec) = &config.nodes else {
            panic!("expected single node spec");
        };
        assert_eq!(spec.id_column.as_deref(), Some("gene_id"));
        assert!(spec.format_curie);
        assert!(spec.strip_version);
        assert_eq!(spec.properties, vec!["gene_name".to_string()]);
    }

    #[test]
    fn node_groups_keep_document_order() {
        let yaml = "nodes:\n  transcript:\n    id_column: transcript_id\n    label_constant: transcript\n  gene:\n    id_column: gene_id\n    label_constant: gene\n";
        let config = MappingConfig::from_yaml_str(yaml).unwrap();

        let NodesSection::Groups(groups) = &config.nodes else {
            panic!("expected node groups");
        };
        let names: Vec<&str> = groups.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["transcript", "gene"]);
    }

    #[test]
    fn renames_keep_document_order() {
        let yaml = "columns:\n  rename:\n    z: a\n    a: b\n  coerce:\n    start: int\n";
        let config = MappingConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.columns.rename,
            vec![("z".to_string(), "a".to_string()), ("a".to_string(), "b".to_string())]
        );
        assert_eq!(config.columns.coerce["start"], CoerceType::Int);
    }

    #[test]
    fn transforms_and_filters_are_typed() {
        let yaml = r#"
filters:
  - {field: score, op: gt, value: 0.5}
transforms:
  - {op: split, field: aliases}
  - {op: explode, field: aliases}
  - {op: format, field: url, template: "https://x/{value}", source: id}
"#;
        let config = MappingConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.filters[0].op, FilterOp::Gt);
        assert_eq!(config.filters[0].value, PropertyValue::Float(0.5));
        assert!(matches!(
            &config.transforms[0],
            TransformSpec::Split { delimiter, .. } if delimiter == ","
        ));
        assert!(matches!(&config.transforms[2], TransformSpec::Format { source: Some(s), .. } if s == "id"));
    }

    #[test]
    fn unknown_op_is_malformed() {
        let yaml = "transforms:\n  - {op: reverse, field: x}\n";
        assert!(MappingConfig::from_yaml_str(yaml).is_err());

        let yaml = "filters:\n  - {field: x, op: contains, value: 1}\n";
        assert!(MappingConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn json_mapping_uses_same_model() {
        let json = r#"{"nodes": {"a": {"id_column": "id", "label_constant": "x"}},
                       "edges": {"source_column": "s", "target_column": "t", "label_constant": "r"}}"#;
        let config = MappingConfig::from_json_str(json).unwrap();
        assert_eq!(config.nodes.specs().len(), 1);
        let edges = config.edges.unwrap();
        assert_eq!(edges.source_column.as_deref(), Some("s"));
        assert!(edges.format_curie);
    }

    #[test]
    fn empty_document_is_empty_mapping() {
        let config = MappingConfig::from_yaml_str("").unwrap();
        assert!(config.nodes.is_empty());
        assert!(config.edges.is_none());
    }

    #[test]
    fn load_mapping_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.conf");
        std::fs::write(&path, "nodes:\n  id_column: id\n  label_constant: x\n").unwrap();
        let config = load_mapping(&path).unwrap();
        assert_eq!(config.nodes.specs().len(), 1);

        assert!(load_mapping(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn label_prefers_present_column() {
        let mut row = BTreeMap::new();
        row.insert("type".to_string(), PropertyValue::from("enhancer"));
        assert_eq!(
            resolve_label(&row, Some("type"), Some("region")).as_deref(),
            Some("enhancer")
        );
        assert_eq!(
            resolve_label(&row, Some("kind"), Some("region")).as_deref(),
            Some("region")
        );
        assert_eq!(resolve_label(&row, Some("kind"), None), None);
    }
}
