//! Core graph data structures

mod edge;
mod node;

#[cfg(test)]
mod tests;

pub use edge::Edge;
pub use node::{Node, NodeId, Properties, PropertyValue};
