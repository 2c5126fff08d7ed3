//! Schema-aware writer
//!
//! Pulls nodes and edges from adapter streams, checks them against the
//! schema, resolves edge endpoint types, normalizes ids and values through
//! the sink's rules, and hands the sink batches per collection
//! (`nodes_<label>`, `edges_<label>`).
//!
//! Lifecycle: `Init → (ReceivingNodes | ReceivingEdges)* → Flushed → Closed`.

pub mod metta;
pub mod neo4j;
pub mod sink;
pub mod sqlite;

pub use metta::MettaSink;
pub use neo4j::Neo4jCsvSink;
pub use sink::{EdgeRecord, MemorySink, NodeRecord, Record, Sink, SinkError, SinkResult};
pub use sqlite::SqliteSink;

use crate::graph::{Edge, Node, Properties};
use crate::identifier::{normalize_label, ontology_of};
use crate::schema::{EdgeTypeTable, Schema};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Endpoint type resolved from the id's ontology prefix
const ONTOLOGY_TERM: &str = "ontology_term";

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("sink failure: {0}")]
    Sink(#[from] SinkError),

    #[error("writer is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Records per collection buffered before a batch is handed to the sink
    pub batch_size: usize,
    pub write_properties: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            write_properties: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Init,
    ReceivingNodes,
    ReceivingEdges,
    Flushed,
    Closed,
}

/// Outcome of one write call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Accepted records per label
    pub counts: BTreeMap<String, usize>,
    /// Records skipped as malformed or not in the schema
    pub dropped: usize,
}

impl WriteSummary {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &WriteSummary) {
        for (label, count) in &other.counts {
            *self.counts.entry(label.clone()).or_insert(0) += count;
        }
        self.dropped += other.dropped;
    }
}

/// Per-call buffers keyed by collection name
struct Buffers {
    batches: BTreeMap<String, Vec<Record>>,
    summary: WriteSummary,
}

impl Buffers {
    fn new() -> Self {
        Self {
            batches: BTreeMap::new(),
            summary: WriteSummary::default(),
        }
    }

    fn drop_record(&mut self) {
        self.summary.dropped += 1;
    }
}

/// Node label as stored: the part after the first `.` when dotted, normalized.
fn node_label(label: &str) -> String {
    let label = match label.split_once('.') {
        Some((_, rest)) => rest.split('.').next().unwrap_or(rest),
        None => label,
    };
    normalize_label(label.trim())
}

pub struct SchemaWriter<S: Sink> {
    sink: S,
    edge_types: EdgeTypeTable,
    node_types: BTreeSet<String>,
    options: WriterOptions,
    state: WriterState,
    indexed: HashSet<String>,
    warned_labels: HashSet<String>,
}

impl<S: Sink> SchemaWriter<S> {
    pub fn new(sink: S, schema: &Schema, options: WriterOptions) -> Self {
        let edge_types = schema.edge_types();
        let node_types = schema.node_types();
        info!(
            node_types = node_types.len(),
            edge_types = edge_types.len(),
            batch_size = options.batch_size,
            "Schema writer ready"
        );
        Self {
            sink,
            edge_types,
            node_types,
            options,
            state: WriterState::Init,
            indexed: HashSet::new(),
            warned_labels: HashSet::new(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn edge_types(&self) -> &EdgeTypeTable {
        &self.edge_types
    }

    pub fn write_nodes<I>(&mut self, nodes: I, adapter: &str) -> Result<WriteSummary, WriterError>
    where
        I: IntoIterator<Item = Node>,
    {
        self.begin(WriterState::ReceivingNodes)?;
        info!(adapter, "Writing nodes");

        let mut buffers = Buffers::new();
        for node in nodes {
            let label = node_label(&node.label);
            if label.is_empty() || node.id.is_empty() {
                warn!(adapter, id = %node.id, label = %node.label, "Skipping malformed node");
                buffers.drop_record();
                continue;
            }
            if !self.node_types.contains(&label) {
                self.warn_unknown_label(adapter, "node", &label);
                buffers.drop_record();
                continue;
            }

            let record = Record::Node(NodeRecord {
                id: self.sink.normalize_id(node.id.as_str()),
                properties: self.normalize_properties(&node.properties),
                label: label.clone(),
            });
            let collection = format!("nodes_{}", label);
            self.push(adapter, &mut buffers, collection, &label, record, &["id"])?;
        }

        self.finish_call(adapter, buffers)
    }

    pub fn write_edges<I>(&mut self, edges: I, adapter: &str) -> Result<WriteSummary, WriterError>
    where
        I: IntoIterator<Item = Edge>,
    {
        self.begin(WriterState::ReceivingEdges)?;
        info!(adapter, "Writing edges");

        let mut buffers = Buffers::new();
        for edge in edges {
            let label = edge.label.trim().to_lowercase();
            if label.is_empty() || edge.source.is_empty() || edge.target.is_empty() {
                warn!(adapter, source = %edge.source, target = %edge.target, "Skipping malformed edge");
                buffers.drop_record();
                continue;
            }
            let Some(edge_type) = self.edge_types.get(&label).cloned() else {
                self.warn_unknown_label(adapter, "edge", &label);
                buffers.drop_record();
                continue;
            };

            let source_type = resolve_endpoint_type(&edge_type.source_type, edge.source.as_str());
            let target_type = resolve_endpoint_type(&edge_type.target_type, edge.target.as_str());
            let stored_label = edge_type.stored_label(&label).to_string();

            let record = Record::Edge(EdgeRecord {
                source_id: self.sink.normalize_id(edge.source.as_str()),
                source_type,
                target_id: self.sink.normalize_id(edge.target.as_str()),
                target_type,
                label: stored_label.clone(),
                properties: self.normalize_properties(&edge.properties),
            });
            let collection = format!("edges_{}", stored_label);
            self.push(adapter, &mut buffers, collection, &label, record, &["source_id", "target_id"])?;
        }

        self.finish_call(adapter, buffers)
    }

    /// Finalize the sink. Later writes fail with [`WriterError::Closed`].
    pub fn close(&mut self) -> Result<(), WriterError> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        self.state = WriterState::Closed;
        self.sink.finish().map_err(|e| {
            error!(error = %e, "Sink failed to finish");
            WriterError::Sink(e)
        })
    }

    fn begin(&mut self, state: WriterState) -> Result<(), WriterError> {
        if self.state == WriterState::Closed {
            return Err(WriterError::Closed);
        }
        self.state = state;
        Ok(())
    }

    fn warn_unknown_label(&mut self, adapter: &str, kind: &str, label: &str) {
        if self.warned_labels.insert(format!("{}:{}", kind, label)) {
            warn!(adapter, kind, label, "Skipping type not found in schema");
        } else {
            debug!(adapter, kind, label, "Skipping type not found in schema");
        }
    }

    fn normalize_properties(&self, properties: &Properties) -> Properties {
        if !self.options.write_properties {
            return Properties::new();
        }
        properties
            .iter()
            .map(|(key, value)| (key.clone(), self.sink.normalize_value(value)))
            .collect()
    }

    fn push(
        &mut self,
        adapter: &str,
        buffers: &mut Buffers,
        collection: String,
        label: &str,
        record: Record,
        index_fields: &[&str],
    ) -> Result<(), WriterError> {
        if self.indexed.insert(collection.clone()) {
            for field in index_fields {
                self.sink
                    .ensure_index(&collection, field)
                    .map_err(|e| self.sink_failure(adapter, e))?;
            }
        }

        *buffers.summary.counts.entry(label.to_string()).or_insert(0) += 1;

        let batch = buffers.batches.entry(collection.clone()).or_default();
        batch.push(record);
        if batch.len() >= self.options.batch_size.max(1) {
            let records = std::mem::take(batch);
            self.insert(adapter, &collection, records)?;
        }
        Ok(())
    }

    fn insert(&mut self, adapter: &str, collection: &str, records: Vec<Record>) -> Result<(), WriterError> {
        let count = records.len();
        self.sink
            .insert_batch(adapter, collection, records)
            .map_err(|e| self.sink_failure(adapter, e))?;
        debug!(adapter, collection, count, "Inserted batch");
        Ok(())
    }

    fn finish_call(&mut self, adapter: &str, buffers: Buffers) -> Result<WriteSummary, WriterError> {
        let Buffers { batches, summary } = buffers;
        for (collection, records) in batches {
            if !records.is_empty() {
                self.insert(adapter, &collection, records)?;
            }
        }
        self.sink.flush(adapter).map_err(|e| self.sink_failure(adapter, e))?;
        self.state = WriterState::Flushed;

        info!(adapter, counts = ?summary.counts, dropped = summary.dropped, "Finished writing");
        Ok(summary)
    }

    fn sink_failure(&self, adapter: &str, e: SinkError) -> WriterError {
        error!(adapter, error = %e, "Sink failure, abandoning adapter output");
        WriterError::Sink(e)
    }
}

/// `ontology_term` endpoints take their type from the id's ontology prefix.
fn resolve_endpoint_type(declared: &str, id: &str) -> String {
    if declared == ONTOLOGY_TERM {
        ontology_of(id)
    } else {
        declared.to_string()
    }
}
