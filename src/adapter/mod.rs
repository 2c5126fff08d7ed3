//! Adapter layer
//!
//! Adapters turn source files into lazy streams of graph nodes and edges.
//! The generic adapter is driven entirely by a mapping file; source-specific
//! adapters live next to it and are looked up by name through the registry.

pub mod aliases;
pub mod gencode;
pub mod generic;
pub mod genomic;
pub mod mapping;
pub mod reader;
pub mod registry;
pub mod transform;
mod traits;

pub use aliases::{AliasKey, AliasTable, LookupTables};
pub use gencode::{GencodeGeneAdapter, GencodeGeneArgs};
pub use generic::{GenericAdapterArgs, GenericDataAdapter};
pub use genomic::{Containment, GenomicRegion, LocationPredicate, Locus};
pub use mapping::{load_mapping, MappingConfig, MappingError};
pub use reader::{read_records, DataFormat, Records, Row};
pub use registry::{AdapterContext, AdapterRegistry};
pub use traits::{Adapter, AdapterError, AdapterOptions, EdgeStream, NodeStream};
pub use transform::{RecordError, TransformPipeline};
