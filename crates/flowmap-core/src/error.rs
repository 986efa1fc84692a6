//! Import and compile error types.

use thiserror::Error;

use crate::graph::{NodeId, Port};
use crate::transform::CodecError;

/// Result type for import, compile and graph operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while importing, editing or compiling a workflow.
#[derive(Debug, Error)]
pub enum Error {
    /// A node or state references a type with no registry entry.
    #[error("unregistered node type: {type_name}")]
    UnregisteredType {
        /// The type name that failed to resolve.
        type_name: String,
    },

    /// A transition references a state that does not exist.
    #[error("state {state} transitions to unknown state {target}")]
    UnresolvedTransition {
        /// State (or `start`) holding the reference.
        state: String,
        /// The dangling reference.
        target: String,
    },

    /// A single-connection output port is already occupied.
    #[error("output port {port} of node {node_id} is already connected")]
    PortCapacity {
        /// Source node of the rejected edge.
        node_id: NodeId,
        /// The occupied port.
        port: Port,
    },

    /// One or more nodes have not been confirmed by the user yet.
    #[error("uninitialized nodes: {}", .0.join(", "))]
    UninitializedNodes(Vec<String>),

    /// A transform value could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Two primitive nodes share the same state id.
    #[error("duplicate state id: {0}")]
    DuplicateStateId(String),

    /// A primitive node has no state id assigned.
    #[error("node {0} has no state id")]
    MissingStateId(NodeId),

    /// A node does not exist in the graph.
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    /// A port index is outside the node's port list.
    #[error("node {node_id} has no port {port}")]
    PortOutOfRange {
        /// Node that was addressed.
        node_id: NodeId,
        /// The missing port.
        port: Port,
    },

    /// An output port is connected but its node type has no field for it.
    #[error("output port {port} of state {state} does not map to a transition field")]
    DanglingPort {
        /// State owning the port.
        state: String,
        /// The unmapped port.
        port: Port,
    },

    /// The graph has no start node.
    #[error("workflow graph has no start node")]
    MissingStartNode,

    /// The start node is not connected to any state.
    #[error("start node is not connected to any state")]
    MissingEntryState,

    /// Graph or document structure is invalid.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// YAML parsing or serialization failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates an unresolved transition error.
    pub fn unresolved(state: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnresolvedTransition {
            state: state.into(),
            target: target.into(),
        }
    }

    /// Creates an unregistered type error.
    pub fn unregistered(type_name: impl Into<String>) -> Self {
        Self::UnregisteredType {
            type_name: type_name.into(),
        }
    }
}
