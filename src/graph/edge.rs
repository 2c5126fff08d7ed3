//! Edge representation in the property graph

use super::node::{NodeId, Properties, PropertyValue};
use serde::{Deserialize, Serialize};

/// A directed, labelled edge between two nodes.
///
/// Endpoint types are not stored here: the writer derives them from the
/// schema when the edge is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Type of relationship (e.g. "transcribed_to", "belongs_to")
    pub label: String,
    /// Additional properties
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    /// Create a new edge
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}
