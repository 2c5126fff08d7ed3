//! Sink contract and the in-memory sink
//!
//! The writer hands sinks batches of [`Record`]s already resolved against
//! the schema. Sinks decide how ids and values are normalized through the
//! overridable [`Sink::normalize_id`] and [`Sink::normalize_value`].

use crate::graph::{Properties, PropertyValue};
use crate::identifier;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// A node ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    pub properties: Properties,
}

/// An edge ready for storage, endpoint types resolved
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub source_id: String,
    pub source_type: String,
    pub target_id: String,
    pub target_type: String,
    pub label: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Node(NodeRecord),
    Edge(EdgeRecord),
}

impl Record {
    /// Flat document: fixed fields first, then properties.
    ///
    /// Nodes carry `id`; edges carry `source_id`, `target_id`,
    /// `source_type`, `target_type` and `label`. Properties never override
    /// the fixed fields.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = Map::new();
        let properties = match self {
            Record::Node(node) => {
                document.insert("id".to_string(), Value::String(node.id.clone()));
                &node.properties
            }
            Record::Edge(edge) => {
                document.insert("source_id".to_string(), Value::String(edge.source_id.clone()));
                document.insert("target_id".to_string(), Value::String(edge.target_id.clone()));
                document.insert("source_type".to_string(), Value::String(edge.source_type.clone()));
                document.insert("target_type".to_string(), Value::String(edge.target_type.clone()));
                document.insert("label".to_string(), Value::String(edge.label.clone()));
                &edge.properties
            }
        };
        for (key, value) in properties {
            if !document.contains_key(key) {
                document.insert(key.clone(), value.to_json());
            }
        }
        document
    }

    pub fn label(&self) -> &str {
        match self {
            Record::Node(node) => &node.label,
            Record::Edge(edge) => &edge.label,
        }
    }
}

/// Characters removed or replaced in stored strings
fn clean_string(value: &str) -> String {
    value
        .chars()
        .filter_map(|c| match c {
            '|' | '\'' | '"' => None,
            ';' => Some(' '),
            other => Some(other),
        })
        .collect()
}

/// Default value rules of document and CSV sinks.
///
/// Strings lose `|` and quotes and have `;` replaced by a space; arrays
/// become a JSON array string of normalized items; objects are normalized
/// value by value.
pub fn normalize_value(value: &PropertyValue) -> PropertyValue {
    match value {
        PropertyValue::String(s) => PropertyValue::String(clean_string(s)),
        PropertyValue::Array(items) => {
            let items: Vec<Value> = items.iter().map(|item| normalize_value(item).to_json()).collect();
            PropertyValue::String(Value::Array(items).to_string())
        }
        PropertyValue::Object(map) => PropertyValue::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), normalize_value(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Destination of resolved graph records.
pub trait Sink {
    /// Make sure `collection` is indexed on `field`.
    fn ensure_index(&mut self, _collection: &str, _field: &str) -> SinkResult<()> {
        Ok(())
    }

    /// Store one batch; a batch is all-or-nothing where the backend allows.
    fn insert_batch(&mut self, adapter: &str, collection: &str, records: Vec<Record>) -> SinkResult<()>;

    /// Called at the end of every write call of an adapter.
    fn flush(&mut self, _adapter: &str) -> SinkResult<()> {
        Ok(())
    }

    /// Called once when the writer closes.
    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }

    fn normalize_id(&self, id: &str) -> String {
        identifier::normalize_id(id)
    }

    fn normalize_value(&self, value: &PropertyValue) -> PropertyValue {
        normalize_value(value)
    }
}

/// One stored batch
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub adapter: String,
    pub collection: String,
    pub records: Vec<Record>,
}

/// Keeps every batch in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Batch>,
    pub indexes: Vec<(String, String)>,
    pub flushes: Vec<String>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records stored in `collection`, in insertion order
    pub fn records(&self, collection: &str) -> Vec<&Record> {
        self.batches
            .iter()
            .filter(|batch| batch.collection == collection)
            .flat_map(|batch| batch.records.iter())
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.records.len()).sum()
    }
}

impl Sink for MemorySink {
    fn ensure_index(&mut self, collection: &str, field: &str) -> SinkResult<()> {
        let index = (collection.to_string(), field.to_string());
        if !self.indexes.contains(&index) {
            self.indexes.push(index);
        }
        Ok(())
    }

    fn insert_batch(&mut self, adapter: &str, collection: &str, records: Vec<Record>) -> SinkResult<()> {
        self.batches.push(Batch {
            adapter: adapter.to_string(),
            collection: collection.to_string(),
            records,
        });
        Ok(())
    }

    fn flush(&mut self, adapter: &str) -> SinkResult<()> {
        self.flushes.push(adapter.to_string());
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.finished = true;
        Ok(())
    }
}
