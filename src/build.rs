//! Build run: manifest → adapters → schema writer → sink
//!
//! The adapters manifest lists, in order, which adapter to run under which
//! name and whether its nodes and edges are wanted:
//!
//! ```yaml
//! gencode_genes:
//!   adapter:
//!     name: gencode_gene
//!     args:
//!       filepath: data/gencode.gtf.gz
//!   nodes: true
//!   edges: false
//! ```
//!
//! Adapters are isolated from each other: a construction or write failure
//! is logged, recorded in the [`RunReport`], and the run moves on.

use crate::adapter::{
    AdapterContext, AdapterError, AdapterOptions, AdapterRegistry, AliasKey, AliasTable, LookupTables,
};
use crate::config::{BuildConfig, WriterKind};
use crate::schema::{Schema, SchemaError};
use crate::writer::{
    MemorySink, MettaSink, Neo4jCsvSink, SchemaWriter, Sink, SinkError, SqliteSink, WriteSummary,
    WriterError, WriterOptions,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid adapters manifest: {0}")]
    Manifest(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("cannot open sink: {0}")]
    Sink(#[from] SinkError),

    #[error("cannot load lookup table: {0}")]
    Lookup(#[from] AdapterError),
}

#[derive(Debug, Deserialize)]
struct RawAdapter {
    name: String,
    #[serde(default)]
    args: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    adapter: RawAdapter,
    #[serde(default = "default_true")]
    nodes: bool,
    #[serde(default = "default_true")]
    edges: bool,
}

fn default_true() -> bool {
    true
}

/// One manifest entry
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Entry name; the adapter id and the sink's per-adapter key
    pub name: String,
    /// Registered adapter name
    pub adapter: String,
    pub args: serde_json::Value,
    pub nodes: bool,
    pub edges: bool,
}

/// Adapters manifest, entries in document order
#[derive(Debug, Clone, Default)]
pub struct AdaptersManifest {
    entries: Vec<ManifestEntry>,
}

impl AdaptersManifest {
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BuildError::Manifest(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, BuildError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mapping: Option<serde_yaml::Mapping> =
            serde_yaml::from_str(content).map_err(|e| BuildError::Manifest(e.to_string()))?;

        let mut entries = Vec::new();
        for (key, value) in mapping.unwrap_or_default() {
            let name = key
                .as_str()
                .ok_or_else(|| BuildError::Manifest(format!("entry names must be strings, got {:?}", key)))?
                .to_string();
            let raw: RawEntry = serde_yaml::from_value(value)
                .map_err(|e| BuildError::Manifest(format!("{}: {}", name, e)))?;
            let args = match raw.adapter.args {
                serde_yaml::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
                args => serde_json::to_value(args)
                    .map_err(|e| BuildError::Manifest(format!("{}: {}", name, e)))?,
            };
            entries.push(ManifestEntry {
                name,
                adapter: raw.adapter.name,
                args,
                nodes: raw.nodes,
                edges: raw.edges,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one manifest entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterReport {
    pub name: String,
    pub nodes: WriteSummary,
    pub edges: WriteSummary,
    /// Why the entry's output was abandoned, if it was
    pub error: Option<String>,
}

impl AdapterReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub adapters: Vec<AdapterReport>,
    /// Accepted nodes per label across all adapters
    pub node_counts: BTreeMap<String, usize>,
    /// Accepted edges per label across all adapters
    pub edge_counts: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn total_nodes(&self) -> usize {
        self.node_counts.values().sum()
    }

    pub fn total_edges(&self) -> usize {
        self.edge_counts.values().sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &AdapterReport> {
        self.adapters.iter().filter(|report| !report.succeeded())
    }

    fn record(&mut self, report: AdapterReport) {
        for (label, count) in &report.nodes.counts {
            *self.node_counts.entry(label.clone()).or_insert(0) += count;
        }
        for (label, count) in &report.edges.counts {
            *self.edge_counts.entry(label.clone()).or_insert(0) += count;
        }
        self.adapters.push(report);
    }
}

/// Drives adapters into a [`SchemaWriter`].
pub struct KnowledgeGraphBuilder<S: Sink> {
    writer: SchemaWriter<S>,
    registry: AdapterRegistry,
    lookups: LookupTables,
    options: AdapterOptions,
    lookup_max_age: chrono::Duration,
}

impl<S: Sink> KnowledgeGraphBuilder<S> {
    pub fn new(sink: S, schema: &Schema, writer_options: WriterOptions) -> Self {
        Self {
            writer: SchemaWriter::new(sink, schema, writer_options),
            registry: AdapterRegistry::with_defaults(),
            lookups: LookupTables::new(),
            options: AdapterOptions::default(),
            lookup_max_age: chrono::Duration::hours(24),
        }
    }

    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_lookups(mut self, lookups: LookupTables) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn with_adapter_options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_lookup_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.lookup_max_age = max_age;
        self
    }

    pub fn writer(&self) -> &SchemaWriter<S> {
        &self.writer
    }

    /// Run every manifest entry in order.
    pub fn run(&mut self, manifest: &AdaptersManifest) -> RunReport {
        info!(adapters = manifest.len(), "Starting build");
        let mut report = RunReport::default();

        for entry in manifest.entries() {
            let refreshed = self.lookups.refresh_stale(self.lookup_max_age);
            if refreshed > 0 {
                info!(refreshed, "Reloaded stale lookup tables");
            }
            let adapter_report = self.run_entry(entry);
            report.record(adapter_report);
        }

        info!(
            nodes = report.total_nodes(),
            edges = report.total_edges(),
            failed = report.failed().count(),
            "Build finished"
        );
        report
    }

    fn run_entry(&mut self, entry: &ManifestEntry) -> AdapterReport {
        let mut report = AdapterReport::new(&entry.name);
        let ctx = AdapterContext {
            id: &entry.name,
            options: self.options,
            lookups: &self.lookups,
        };

        let adapter = match self.registry.build(&entry.adapter, entry.args.clone(), &ctx) {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(adapter = %entry.name, error = %e, "Cannot construct adapter, skipping");
                report.error = Some(e.to_string());
                return report;
            }
        };

        if entry.nodes {
            match self.writer.write_nodes(adapter.get_nodes(), adapter.id()) {
                Ok(summary) => report.nodes = summary,
                Err(e) => return abandon(report, e),
            }
        }
        if entry.edges {
            match self.writer.write_edges(adapter.get_edges(), adapter.id()) {
                Ok(summary) => report.edges = summary,
                Err(e) => return abandon(report, e),
            }
        }
        if !entry.nodes && !entry.edges {
            warn!(adapter = %entry.name, "Entry writes neither nodes nor edges");
        }
        report
    }

    /// Close the writer and hand back the sink.
    pub fn finish(mut self) -> Result<S, WriterError> {
        self.writer.close()?;
        Ok(self.writer.into_sink())
    }
}

fn abandon(mut report: AdapterReport, e: WriterError) -> AdapterReport {
    error!(adapter = %report.name, error = %e, "Abandoning adapter output");
    report.error = Some(e.to_string());
    report
}

/// Load the lookup tables named in the configuration.
pub fn load_lookups(config: &BuildConfig) -> Result<LookupTables, BuildError> {
    let mut lookups = LookupTables::new();
    if let Some(path) = &config.gene_alias_file {
        lookups.insert(AliasTable::load(path, AliasKey::GeneId)?);
    }
    if let Some(path) = &config.xref_alias_file {
        lookups.insert(AliasTable::load(path, AliasKey::CrossReference)?);
    }
    Ok(lookups)
}

fn run_with<S: Sink>(sink: S, schema: &Schema, manifest: &AdaptersManifest, config: &BuildConfig) -> Result<RunReport, BuildError> {
    let mut builder = KnowledgeGraphBuilder::new(sink, schema, config.writer_options())
        .with_lookups(load_lookups(config)?)
        .with_adapter_options(config.adapter_options())
        .with_lookup_max_age(config.lookup_max_age());
    let report = builder.run(manifest);
    if let Err(e) = builder.finish() {
        error!(error = %e, "Failed to finalize sink");
    }
    Ok(report)
}

/// Load schema and manifest, open the configured sink and run the build.
pub fn run_build(config: &BuildConfig) -> Result<RunReport, BuildError> {
    let manifest = AdaptersManifest::load(&config.adapters_path)?;
    let schema = Schema::load(&config.schema_path)?;
    info!(
        writer = %config.writer,
        output = %config.output_dir.display(),
        adapters = manifest.len(),
        "Loaded build configuration"
    );

    match config.writer {
        WriterKind::Sqlite => run_with(SqliteSink::open(config.database_path())?, &schema, &manifest, config),
        WriterKind::Neo4j => run_with(Neo4jCsvSink::new(&config.output_dir)?, &schema, &manifest, config),
        WriterKind::Metta => run_with(MettaSink::create(&config.output_dir, &schema)?, &schema, &manifest, config),
        WriterKind::Memory => run_with(MemorySink::new(), &schema, &manifest, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{Record, SinkResult, WriterState};
    use serde_json::json;

    const SCHEMA: &str = "gene:\n  represented_as: node\n  input_label: gene\n";

    /// Rejects every batch for one collection, stores the rest.
    struct RejectingSink {
        rejected: &'static str,
        inner: MemorySink,
    }

    impl Sink for RejectingSink {
        fn insert_batch(&mut self, adapter: &str, collection: &str, records: Vec<Record>) -> SinkResult<()> {
            if collection == self.rejected {
                return Err(SinkError::Io(std::io::Error::other("disk full")));
            }
            self.inner.insert_batch(adapter, collection, records)
        }
    }

    fn generic_entry(dir: &Path, name: &str, rows: &str, label: &str) -> String {
        let data = dir.join(format!("{}.tsv", name));
        std::fs::write(&data, rows).unwrap();
        let mapping = dir.join(format!("{}.yaml", name));
        std::fs::write(&mapping, format!("nodes:\n  id_column: id\n  label_constant: {}\n", label)).unwrap();
        format!(
            "{}:\n  adapter:\n    name: generic\n    args:\n      filepath: {}\n      data_format: tsv\n      mapping_config: {}\n",
            name,
            data.display(),
            mapping.display()
        )
    }

    #[test]
    fn manifest_keeps_document_order() {
        let manifest = AdaptersManifest::from_yaml_str(
            r#"
zeta:
  adapter:
    name: generic
    args:
      filepath: z.tsv
      data_format: tsv
alpha:
  adapter:
    name: gencode_gene
  nodes: true
  edges: false
"#,
        )
        .unwrap();

        let names: Vec<&str> = manifest.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(manifest.entries()[0].args, json!({"filepath": "z.tsv", "data_format": "tsv"}));
        assert!(manifest.entries()[0].edges);
        assert_eq!(manifest.entries()[1].args, json!({}));
        assert!(!manifest.entries()[1].edges);
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let result = AdaptersManifest::from_yaml_str("genes:\n  nodes: true\n");
        assert!(matches!(result, Err(BuildError::Manifest(_))));
    }

    #[test]
    fn failing_adapter_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("genes.tsv");
        std::fs::write(&data, "gene_id\tgene_name\nENSG1\tA\n").unwrap();
        let mapping = dir.path().join("mapping.yaml");
        std::fs::write(&mapping, "nodes:\n  id_column: gene_id\n  label_constant: gene\n").unwrap();

        let manifest = AdaptersManifest::from_yaml_str(&format!(
            "broken:\n  adapter:\n    name: vcf\ngenes:\n  adapter:\n    name: generic\n    args:\n      filepath: {}\n      data_format: tsv\n      mapping_config: {}\n",
            data.display(),
            mapping.display()
        ))
        .unwrap();

        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        let mut builder = KnowledgeGraphBuilder::new(MemorySink::new(), &schema, WriterOptions::default());
        let report = builder.run(&manifest);

        assert_eq!(report.adapters.len(), 2);
        assert!(report.adapters[0].error.as_deref().unwrap().contains("vcf"));
        assert!(report.adapters[1].succeeded());
        assert_eq!(report.node_counts["gene"], 1);
        assert_eq!(report.failed().count(), 1);

        let sink = builder.finish().unwrap();
        assert!(sink.finished);
        assert_eq!(sink.records("nodes_gene").len(), 1);
    }

    #[test]
    fn sink_failure_abandons_only_that_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = [
            generic_entry(dir.path(), "transcripts", "id\nENST1\nENST2\n", "transcript"),
            generic_entry(dir.path(), "genes", "id\nENSG1\n", "gene"),
        ]
        .concat();
        let manifest = AdaptersManifest::from_yaml_str(&manifest).unwrap();

        let schema = Schema::from_yaml_str(
            "gene:\n  represented_as: node\n  input_label: gene\ntranscript:\n  represented_as: node\n  input_label: transcript\n",
        )
        .unwrap();
        let sink = RejectingSink {
            rejected: "nodes_transcript",
            inner: MemorySink::new(),
        };
        let mut builder = KnowledgeGraphBuilder::new(sink, &schema, WriterOptions::default());
        let report = builder.run(&manifest);

        let failed: Vec<&str> = report.failed().map(|r| r.name.as_str()).collect();
        assert_eq!(failed, vec!["transcripts"]);
        assert!(report.adapters[0].error.as_deref().unwrap().contains("disk full"));
        assert!(report.adapters[1].succeeded());
        assert_eq!(report.node_counts["gene"], 1);
        assert!(!report.node_counts.contains_key("transcript"));
        assert_ne!(builder.writer().state(), WriterState::Closed);

        let again = builder.run(&AdaptersManifest::from_yaml_str(&generic_entry(
            dir.path(),
            "more_genes",
            "id\nENSG2\n",
            "gene",
        ))
        .unwrap());
        assert!(again.adapters[0].succeeded());

        let sink = builder.finish().unwrap();
        assert_eq!(sink.inner.records("nodes_gene").len(), 2);
        assert!(sink.inner.records("nodes_transcript").is_empty());
    }
}
