//! GenericDataAdapter: configuration-driven adapter
//!
//! Turns any supported tabular or JSON source into nodes and edges using a
//! mapping file. Each call to `get_nodes`/`get_edges` makes a fresh lazy pass
//! over the file: reader → transform pipeline → genomic filter → identifier
//! formatting → property extraction.

use crate::adapter::aliases::{AliasKey, AliasTable};
use crate::adapter::genomic::{locus_from_row, Containment, GenomicRegion, LocationPredicate};
use crate::adapter::mapping::{load_mapping, resolve_label, EdgeSpec, MappingConfig, NodeSpec};
use crate::adapter::reader::{read_records, Row};
use crate::adapter::traits::{Adapter, AdapterOptions, EdgeStream, NodeStream};
use crate::adapter::transform::TransformPipeline;
use crate::graph::{Edge, Node, Properties, PropertyValue};
use crate::identifier::format_curie;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

fn default_data_format() -> String {
    "csv".to_string()
}

fn default_source() -> String {
    "UserData".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Constructor arguments, as found under `adapter.args` in a manifest
#[derive(Debug, Clone, Deserialize)]
pub struct GenericAdapterArgs {
    pub filepath: PathBuf,
    #[serde(default = "default_data_format")]
    pub data_format: String,
    pub mapping_config: Option<PathBuf>,
    pub gene_alias_file_path: Option<PathBuf>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub source_url: Option<String>,
    pub chr: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl GenericAdapterArgs {
    pub fn new(filepath: impl Into<PathBuf>, data_format: &str) -> Self {
        Self {
            filepath: filepath.into(),
            data_format: data_format.to_string(),
            mapping_config: None,
            gene_alias_file_path: None,
            source: default_source(),
            version: default_version(),
            source_url: None,
            chr: None,
            start: None,
            end: None,
        }
    }
}

pub struct GenericDataAdapter {
    id: String,
    args: GenericAdapterArgs,
    options: AdapterOptions,
    mapping: MappingConfig,
    pipeline: TransformPipeline,
    aliases: Option<Arc<AliasTable>>,
    bound: GenomicRegion,
    predicate: Box<dyn LocationPredicate>,
}

impl GenericDataAdapter {
    /// Build an adapter. Never fails: an unreadable or malformed mapping is
    /// logged and treated as an empty mapping, an unreadable alias file as no
    /// aliases.
    pub fn new(args: GenericAdapterArgs, options: AdapterOptions) -> Self {
        let mapping = match &args.mapping_config {
            Some(path) => load_mapping(path).unwrap_or_else(|e| {
                error!(path = %path.display(), error = %e, "Failed to load mapping config");
                MappingConfig::default()
            }),
            None => MappingConfig::default(),
        };

        let aliases = args.gene_alias_file_path.as_ref().and_then(|path| {
            match AliasTable::load(path, AliasKey::GeneId) {
                Ok(table) => Some(Arc::new(table)),
                Err(e) => {
                    warn!(error = %e, "Failed to load gene aliases");
                    None
                }
            }
        });

        let bound = GenomicRegion::new(args.chr.as_deref(), args.start, args.end);

        Self {
            id: "generic".to_string(),
            pipeline: TransformPipeline::new(&mapping),
            mapping,
            aliases,
            bound,
            predicate: Box::new(Containment),
            args,
            options,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Use a shared alias table instead of the one named in the arguments.
    pub fn with_aliases(mut self, aliases: Arc<AliasTable>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn with_predicate(mut self, predicate: impl LocationPredicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn mapping(&self) -> &MappingConfig {
        &self.mapping
    }

    /// Transformed rows of a fresh pass over the source
    fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        read_records(&self.args.filepath, &self.args.data_format)
            .flat_map(move |row| self.pipeline.process(row))
    }

    fn node_spec_is_usable(&self, spec: &NodeSpec) -> bool {
        if spec.id_column.is_none() {
            error!(adapter = %self.id, "Node configuration missing 'id_column'");
            return false;
        }
        if spec.label_column.is_none() && spec.label_constant.is_none() {
            error!(adapter = %self.id, "Node configuration missing 'label_column' or 'label_constant'");
            return false;
        }
        true
    }

    fn passes_location(&self, row: &Row, spec: &NodeSpec) -> bool {
        match locus_from_row(
            row,
            spec.chr_column.as_deref(),
            spec.start_column.as_deref(),
            spec.end_column.as_deref(),
        ) {
            Ok(Some(locus)) => self.predicate.contains(&self.bound, &locus),
            Ok(None) => true,
            Err(e) => {
                warn!(adapter = %self.id, error = %e, "Rejecting record");
                false
            }
        }
    }

    fn build_node(&self, spec: &NodeSpec, row: &Row) -> Option<Node> {
        if !self.passes_location(row, spec) {
            return None;
        }

        let raw_id = spec
            .id_column
            .as_deref()
            .and_then(|column| row.get(column))
            .filter(|value| !value.is_blank())?
            .to_string();
        let id = if spec.format_curie {
            format_curie(&raw_id, spec.id_prefix.as_deref(), spec.strip_version)
        } else {
            raw_id
        };

        let Some(label) = resolve_label(row, spec.label_column.as_deref(), spec.label_constant.as_deref()) else {
            debug!(adapter = %self.id, id = %id, "Skipping node without label");
            return None;
        };

        let mut properties = Properties::new();
        if self.options.write_properties {
            properties = self.extract_properties(row, &spec.properties);
            for (key, column) in [
                ("chr", &spec.chr_column),
                ("start", &spec.start_column),
                ("end", &spec.end_column),
            ] {
                if let Some(value) = column.as_deref().and_then(|c| row.get(c)) {
                    properties.insert(key.to_string(), value.clone());
                }
            }
            self.add_provenance(&mut properties);
        }

        Some(Node::new(id, label).with_properties(properties))
    }

    fn build_edge(&self, spec: &EdgeSpec, row: &Row) -> Option<Edge> {
        let endpoint = |column: &Option<String>| {
            column
                .as_deref()
                .and_then(|c| row.get(c))
                .filter(|value| !value.is_blank())
                .map(PropertyValue::to_string)
        };
        let source = endpoint(&spec.source_column)?;
        let target = endpoint(&spec.target_column)?;

        let (source, target) = if spec.format_curie {
            (
                format_curie(&source, spec.source_prefix.as_deref(), spec.strip_version),
                format_curie(&target, spec.target_prefix.as_deref(), spec.strip_version),
            )
        } else {
            (source, target)
        };

        let label = resolve_label(row, spec.label_column.as_deref(), spec.label_constant.as_deref())?;

        let mut properties = Properties::new();
        if self.options.write_properties {
            properties = self.extract_properties(row, &spec.properties);
            self.add_provenance(&mut properties);
        }

        Some(Edge::new(source, target, label).with_properties(properties))
    }

    /// Allow-listed, present, non-missing values plus alias synonyms.
    fn extract_properties(&self, row: &Row, allowed: &[String]) -> Properties {
        let mut properties: Properties = allowed
            .iter()
            .filter_map(|name| {
                row.get(name)
                    .filter(|value| !value.is_missing())
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();

        if let (Some(aliases), Some(gene_id)) = (&self.aliases, row.get("gene_id")) {
            if let Some(synonyms) = aliases.get(&gene_id.to_string()) {
                properties.insert("synonyms".to_string(), PropertyValue::from(synonyms.to_vec()));
            }
        }

        properties
    }

    fn add_provenance(&self, properties: &mut Properties) {
        if !self.options.add_provenance {
            return;
        }
        properties.insert("source".to_string(), self.args.source.clone().into());
        properties.insert("version".to_string(), self.args.version.clone().into());
        if let Some(url) = self.args.source_url.as_ref().filter(|u| !u.is_empty()) {
            properties.insert("source_url".to_string(), url.clone().into());
        }
    }
}

impl Adapter for GenericDataAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn get_nodes(&self) -> NodeStream<'_> {
        let specs: Vec<&NodeSpec> = self
            .mapping
            .nodes
            .specs()
            .into_iter()
            .filter(|spec| self.node_spec_is_usable(spec))
            .collect();

        Box::new(specs.into_iter().flat_map(move |spec| {
            self.rows().filter_map(move |row| self.build_node(spec, &row))
        }))
    }

    fn get_edges(&self) -> EdgeStream<'_> {
        let Some(spec) = &self.mapping.edges else {
            return Box::new(std::iter::empty());
        };

        if spec.source_column.is_none() || spec.target_column.is_none() {
            error!(adapter = %self.id, "Edge configuration missing 'source_column' or 'target_column'");
            return Box::new(std::iter::empty());
        }
        if spec.label_column.is_none() && spec.label_constant.is_none() {
            error!(adapter = %self.id, "Edge configuration missing 'label_column' or 'label_constant'");
            return Box::new(std::iter::empty());
        }

        Box::new(self.rows().filter_map(move |row| self.build_edge(spec, &row)))
    }
}
