//! Adapter trait: the contract adapters implement
//!
//! An adapter turns one source (a file plus its configuration) into lazy
//! streams of graph nodes and edges. The writer pulls from those streams;
//! adapters never push.

use crate::graph::{Edge, Node};
use thiserror::Error;

/// Errors raised while constructing an adapter.
///
/// Errors that happen while iterating are never returned: they are logged
/// and the offending record (or the whole stream) is skipped.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("invalid arguments for adapter {adapter}: {source}")]
    InvalidArgs {
        adapter: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("lookup table error: {0}")]
    Lookup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flags shared by every adapter of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Include properties on emitted nodes and edges
    pub write_properties: bool,
    /// Add `source`/`version`/`source_url` provenance properties
    pub add_provenance: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            write_properties: true,
            add_provenance: true,
        }
    }
}

/// Lazy, finite node stream
pub type NodeStream<'a> = Box<dyn Iterator<Item = Node> + 'a>;

/// Lazy, finite edge stream
pub type EdgeStream<'a> = Box<dyn Iterator<Item = Edge> + 'a>;

/// The contract adapters implement.
///
/// Each call starts a fresh pass over the source; streams are not
/// restartable once consumed.
pub trait Adapter {
    /// Identifier used in logs and run reports
    fn id(&self) -> &str;

    /// Stream the nodes this source describes.
    fn get_nodes(&self) -> NodeStream<'_>;

    /// Stream the edges this source describes.
    fn get_edges(&self) -> EdgeStream<'_>;
}
