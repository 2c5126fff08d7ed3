//! biokg: configuration-driven biological knowledge graph builder
//!
//! Source files (CSV, TSV, JSON, JSONL, GTF, optionally gzipped) are turned
//! into property-graph nodes and edges by adapters, checked against a schema
//! and written to a sink.
//!
//! # Core Concepts
//!
//! - **Adapters**: lazy node/edge streams over one source, either driven by a
//!   mapping file ([`GenericDataAdapter`]) or source-specific
//! - **Schema**: the node types and edge types a graph may contain
//! - **Writer**: validates, normalizes and batches records for a [`Sink`]
//!
//! # Example
//!
//! ```
//! use biokg::{MemorySink, Schema, SchemaWriter, WriterOptions};
//! use biokg::graph::Node;
//!
//! let schema = Schema::from_yaml_str("gene:\n  represented_as: node\n  input_label: gene\n").unwrap();
//! let mut writer = SchemaWriter::new(MemorySink::new(), &schema, WriterOptions::default());
//! let summary = writer.write_nodes(vec![Node::new("ENSEMBL:ENSG1", "gene")], "genes").unwrap();
//! assert_eq!(summary.total(), 1);
//! ```

pub mod adapter;
pub mod build;
pub mod config;
pub mod graph;
pub mod identifier;
pub mod logging;
pub mod schema;
pub mod writer;

pub use adapter::{
    Adapter, AdapterError, AdapterOptions, AdapterRegistry, GencodeGeneAdapter, GenericAdapterArgs,
    GenericDataAdapter, MappingConfig,
};
pub use build::{AdaptersManifest, BuildError, KnowledgeGraphBuilder, RunReport};
pub use config::{BuildConfig, WriterKind};
pub use schema::{Schema, SchemaError};
pub use writer::{
    MemorySink, MettaSink, Neo4jCsvSink, SchemaWriter, Sink, SinkError, SqliteSink, WriteSummary, WriterError,
    WriterOptions,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
