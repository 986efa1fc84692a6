//! Edge types for connecting node ports.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::{NodeId, Port};

/// A directed connection from an output port to an input port.
///
/// Edges carry no data of their own; which document field an edge fills is
/// decided by the source node's type from the output port's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Builder)]
#[builder(
    name = "EdgeBuilder",
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct Edge {
    /// Source node ID.
    pub from: NodeId,
    /// Output port on the source node.
    #[builder(default = "Port::FIRST")]
    pub from_port: Port,
    /// Target node ID.
    pub to: NodeId,
    /// Input port on the target node.
    #[builder(default = "Port::FIRST")]
    pub to_port: Port,
}

impl EdgeBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.from.is_none() {
            return Err("from is required".into());
        }
        if self.to.is_none() {
            return Err("to is required".into());
        }
        Ok(())
    }
}

impl Edge {
    /// Creates an edge from `from`'s output `from_port` to `to`'s first input.
    pub fn new(from: NodeId, from_port: Port, to: NodeId) -> Self {
        Self {
            from,
            from_port,
            to,
            to_port: Port::FIRST,
        }
    }

    /// Returns a builder for creating an edge.
    pub fn builder() -> EdgeBuilder {
        EdgeBuilder::default()
    }
}

/// Edge data stored in the underlying petgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeData {
    /// Output port on the source node.
    pub from_port: Port,
    /// Input port on the target node.
    pub to_port: Port,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_builder_defaults_ports() {
        let a = NodeId::from_uuid(Uuid::from_u128(1));
        let b = NodeId::from_uuid(Uuid::from_u128(2));
        let edge = Edge::builder().with_from(a).with_to(b).build().unwrap();
        assert_eq!(edge, Edge::new(a, Port::FIRST, b));
    }

    #[test]
    fn test_builder_requires_endpoints() {
        let a = NodeId::from_uuid(Uuid::from_u128(1));
        assert!(Edge::builder().with_from(a).build().is_err());
    }
}
