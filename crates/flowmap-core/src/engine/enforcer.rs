//! Edge invariant enforcement.
//!
//! The editor routes every new connection through [`EdgeEnforcer::connect`],
//! which decides synchronously whether to keep it, reject it, or displace
//! the edge already leaving the same output port.

use thiserror::Error;

use crate::TRACING_TARGET_ENFORCE;
use crate::error::{Error, Result};
use crate::graph::{Edge, Node, Port, WorkflowGraph};
use crate::registry::NodeRegistry;

/// Why a connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidConnection {
    /// A state's error output may only lead to an error-catch node.
    #[error("error output {port} must lead to an error-catch node")]
    ErrorOutputToState {
        /// The error output port.
        port: Port,
    },
    /// Only a state's error output may lead to an error-catch node.
    #[error("output {port} is not an error output and cannot lead to an error-catch node")]
    OutputToCatch {
        /// The offending output port.
        port: Port,
    },
    /// Special nodes cannot be wired to an error-catch node.
    #[error("error-catch nodes only accept edges from states")]
    SpecialToCatch,
}

/// Outcome of an enforcement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The edge is valid and its output port is free.
    Accept,
    /// The edge is valid; the contained edge leaves the same port and is
    /// displaced.
    Replace(Edge),
    /// The exact edge already exists.
    Unchanged,
    /// The edge breaks a port rule and is not applied.
    Reject(InvalidConnection),
}

impl Verdict {
    /// Returns whether the edge is present after the verdict is applied.
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Reject(_))
    }
}

/// Validates and applies editor-created edges.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEnforcer<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> EdgeEnforcer<'a> {
    /// Creates an enforcer reading port semantics from `registry`.
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    /// Decides what [`connect`](Self::connect) would do, without mutating.
    ///
    /// Fails only if an endpoint or port does not exist, or the source type
    /// is not registered.
    pub fn check(&self, graph: &WorkflowGraph, edge: &Edge) -> Result<Verdict> {
        let source = graph.node(edge.from)?;
        let target = graph.node(edge.to)?;
        if !edge.from_port.within(source.outputs) {
            return Err(Error::PortOutOfRange {
                node_id: edge.from,
                port: edge.from_port,
            });
        }
        if !edge.to_port.within(target.inputs) {
            return Err(Error::PortOutOfRange {
                node_id: edge.to,
                port: edge.to_port,
            });
        }

        if graph.contains_edge(edge) {
            return Ok(Verdict::Unchanged);
        }
        if let Some(reason) = self.violation(source, target, edge.from_port)? {
            return Ok(Verdict::Reject(reason));
        }

        let displaced = (!source.allows_fan_out(edge.from_port))
            .then(|| graph.edge_on(edge.from, edge.from_port))
            .flatten();
        Ok(match displaced {
            Some(existing) => Verdict::Replace(existing),
            None => Verdict::Accept,
        })
    }

    /// Checks `edge` and applies the verdict to `graph`.
    ///
    /// A displaced edge is removed before the new one is added, so no
    /// output port is ever observed holding two edges.
    pub fn connect(&self, graph: &mut WorkflowGraph, edge: Edge) -> Result<Verdict> {
        let verdict = self.check(graph, &edge)?;
        match verdict {
            Verdict::Accept => graph.add_edge(edge)?,
            Verdict::Replace(existing) => {
                graph.remove_edge(&existing);
                graph.add_edge(edge)?;
            }
            Verdict::Unchanged | Verdict::Reject(_) => {}
        }

        tracing::debug!(
            target: TRACING_TARGET_ENFORCE,
            from = %edge.from,
            from_port = %edge.from_port,
            to = %edge.to,
            verdict = ?verdict,
            "Connection enforced"
        );
        Ok(verdict)
    }

    /// Returns the error output of a node, if its type has one.
    pub fn error_port(&self, node: &Node) -> Result<Option<Port>> {
        Ok(self
            .registry
            .lookup(&node.type_name)?
            .connections
            .error_port())
    }

    fn violation(
        &self,
        source: &Node,
        target: &Node,
        port: Port,
    ) -> Result<Option<InvalidConnection>> {
        if !source.is_primitive() {
            return Ok(target.is_catch().then_some(InvalidConnection::SpecialToCatch));
        }

        let is_error_port = self.error_port(source)? == Some(port);
        Ok(match (is_error_port, target.is_catch()) {
            (true, false) => Some(InvalidConnection::ErrorOutputToState { port }),
            (false, true) => Some(InvalidConnection::OutputToCatch { port }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::graph::NodeId;
    use crate::registry::{CATCH_NODE_TYPE, START_NODE_TYPE};

    struct Fixture {
        registry: NodeRegistry,
        graph: WorkflowGraph,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: NodeRegistry::builtin(),
                graph: WorkflowGraph::new(),
            }
        }

        fn add(&mut self, type_name: &str) -> NodeId {
            self.graph
                .add_node(&self.registry, type_name, Map::new())
                .unwrap()
        }

        fn connect(&mut self, from: NodeId, port: u16, to: NodeId) -> Verdict {
            EdgeEnforcer::new(&self.registry)
                .connect(&mut self.graph, Edge::new(from, Port::new(port), to))
                .unwrap()
        }
    }

    #[test]
    fn test_accept_and_unchanged() {
        let mut f = Fixture::new();
        let a = f.add("noop");
        let b = f.add("noop");

        assert_eq!(f.connect(a, 1, b), Verdict::Accept);
        assert_eq!(f.connect(a, 1, b), Verdict::Unchanged);
        assert_eq!(f.graph.edge_count(), 1);
    }

    #[test]
    fn test_replace_displaces_existing_edge() {
        let mut f = Fixture::new();
        let a = f.add("noop");
        let b = f.add("noop");
        let c = f.add("noop");

        f.connect(a, 1, b);
        let verdict = f.connect(a, 1, c);
        assert_eq!(verdict, Verdict::Replace(Edge::new(a, Port::FIRST, b)));
        assert_eq!(f.graph.edge_count(), 1);
        assert_eq!(f.graph.edge_on(a, Port::FIRST).unwrap().to, c);
    }

    #[test]
    fn test_error_port_only_reaches_catch() {
        let mut f = Fixture::new();
        let a = f.add("noop");
        let b = f.add("noop");
        let catch = f.add(CATCH_NODE_TYPE);

        assert!(matches!(
            f.connect(a, 2, b),
            Verdict::Reject(InvalidConnection::ErrorOutputToState { .. })
        ));
        assert!(matches!(
            f.connect(a, 1, catch),
            Verdict::Reject(InvalidConnection::OutputToCatch { .. })
        ));
        assert_eq!(f.connect(a, 2, catch), Verdict::Accept);
        assert_eq!(f.graph.edge_count(), 1);
    }

    #[test]
    fn test_event_race_error_port_is_first_output() {
        let mut f = Fixture::new();
        let race = f.add("eventXor");
        let next = f.add("noop");
        let catch = f.add(CATCH_NODE_TYPE);
        f.graph.resize_outputs(race, 2).unwrap();

        assert!(!f.connect(race, 1, next).is_applied());
        assert_eq!(f.connect(race, 1, catch), Verdict::Accept);
        assert_eq!(f.connect(race, 2, next), Verdict::Accept);
    }

    #[test]
    fn test_start_cannot_reach_catch() {
        let mut f = Fixture::new();
        let start = f.add(START_NODE_TYPE);
        let catch = f.add(CATCH_NODE_TYPE);

        assert_eq!(
            f.connect(start, 1, catch),
            Verdict::Reject(InvalidConnection::SpecialToCatch)
        );
        assert_eq!(f.graph.edge_count(), 0);
    }

    #[test]
    fn test_capacity_and_exclusivity_hold_in_any_order() {
        let mut f = Fixture::new();
        let nodes: Vec<NodeId> = (0..4).map(|_| f.add("noop")).collect();
        let catch = f.add(CATCH_NODE_TYPE);

        for &from in &nodes {
            for &to in nodes.iter().chain([catch].iter()) {
                for port in 1..=2 {
                    f.connect(from, port, to);
                }
            }
        }

        for &from in &nodes {
            for (port, edges) in f.graph.outputs_of(from).unwrap() {
                assert!(edges.len() <= 1);
                if port == Port::new(2) {
                    assert!(edges.iter().all(|edge| edge.to == catch));
                }
            }
        }
    }

    #[test]
    fn test_check_does_not_mutate() {
        let mut f = Fixture::new();
        let a = f.add("noop");
        let b = f.add("noop");

        let verdict = EdgeEnforcer::new(&f.registry)
            .check(&f.graph, &Edge::new(a, Port::FIRST, b))
            .unwrap();
        assert_eq!(verdict, Verdict::Accept);
        assert_eq!(f.graph.edge_count(), 0);
    }
}
