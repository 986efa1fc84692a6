//! Graph node type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{NodeId, Port, Position};
use crate::registry::{CATCH_NODE_TYPE, NodeDescriptor, NodeFamily, START_NODE_TYPE};

/// A vertex of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Registry key of the node's type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the node becomes a document state.
    pub family: NodeFamily,
    /// User-visible state id; only primitive nodes have one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    /// Type-specific, editor-side field values.
    #[serde(default)]
    pub form_data: Map<String, Value>,
    /// Whether the form data has been confirmed by the user.
    pub initialized: bool,
    /// Number of input ports.
    pub inputs: u16,
    /// Number of output ports.
    pub outputs: u16,
    /// Output ports that may hold more than one edge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fan_out: Vec<Port>,
    /// Position in the visual editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    /// Creates a node of the type described by `descriptor`.
    pub fn new(
        type_name: impl Into<String>,
        descriptor: &NodeDescriptor,
        form_data: Map<String, Value>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            family: descriptor.family,
            business_id: None,
            form_data,
            initialized: !descriptor.requires_init,
            inputs: descriptor.inputs,
            outputs: descriptor.outputs,
            fan_out: descriptor.fan_out.clone(),
            position: None,
        }
    }

    /// Sets the state id, returning the node.
    pub fn with_business_id(mut self, business_id: impl Into<String>) -> Self {
        self.business_id = Some(business_id.into());
        self
    }

    /// Returns whether this node becomes a document state.
    pub fn is_primitive(&self) -> bool {
        self.family == NodeFamily::Primitive
    }

    /// Returns whether this is the start node.
    pub fn is_start(&self) -> bool {
        self.family == NodeFamily::Special && self.type_name == START_NODE_TYPE
    }

    /// Returns whether this is an error-catch node.
    pub fn is_catch(&self) -> bool {
        self.family == NodeFamily::Special && self.type_name == CATCH_NODE_TYPE
    }

    /// Returns whether `port` may hold more than one outgoing edge.
    pub fn allows_fan_out(&self, port: Port) -> bool {
        self.fan_out.contains(&port)
    }

    /// Returns a human-readable label for error messages.
    pub fn label(&self, id: NodeId) -> String {
        match &self.business_id {
            Some(business_id) => business_id.clone(),
            None => format!("{}:{id}", self.type_name),
        }
    }
}
