//! Workflow graph model.
//!
//! - [`WorkflowGraph`]: node arena and edges, with port-capacity checks
//! - [`GraphDefinition`]: serializable snapshot (JSON-friendly)
//! - [`GraphMetadata`]: document fields carried through untouched
//! - [`Node`]: a typed vertex with form data and port counts
//! - [`Edge`]: a connection from an output [`Port`] to an input port
//! - [`NodeId`]: unique identifier for nodes

mod definition;
mod edge;
mod graph;
mod id;
mod node;
mod position;

pub use self::definition::{GraphDefinition, GraphMetadata};
pub use self::edge::{Edge, EdgeBuilder, EdgeData};
pub use self::graph::WorkflowGraph;
pub use self::id::{NodeId, Port};
pub use self::node::Node;
pub use self::position::Position;
