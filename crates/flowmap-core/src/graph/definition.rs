//! Serializable graph snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Edge, Node, NodeId};

/// Document fields that have no node or edge of their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Function catalog of the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    /// Top-level keys the editor does not model.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// A serializable snapshot of a [`WorkflowGraph`](super::WorkflowGraph).
///
/// This is the form the editor shell persists between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Nodes keyed by id.
    pub nodes: BTreeMap<NodeId, Node>,
    /// Edges between node ports.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Passthrough document fields.
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl GraphDefinition {
    /// Parses a snapshot from JSON.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the snapshot as pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
