//! Workflow graph representation.

use std::collections::{BTreeMap, HashMap};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde_json::{Map, Value};

use super::definition::{GraphDefinition, GraphMetadata};
use super::{Edge, EdgeData, Node, NodeId, Port};
use crate::error::{Error, Result};
use crate::registry::NodeRegistry;

/// A workflow graph containing nodes and edges.
///
/// Internally uses petgraph's `StableDiGraph` as a node arena, so indices
/// stay valid across removals. Node identity towards callers is always a
/// [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    /// The underlying directed graph.
    graph: StableDiGraph<Node, EdgeData>,
    /// Mapping from NodeId to petgraph's NodeIndex.
    node_indices: HashMap<NodeId, NodeIndex>,
    /// Reverse mapping from NodeIndex to NodeId.
    index_to_id: HashMap<NodeIndex, NodeId>,
    /// Document fields carried through import and compile.
    pub metadata: GraphMetadata,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new workflow graph with metadata.
    pub fn with_metadata(metadata: GraphMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Creates a node of a registered type and returns its ID.
    ///
    /// The node starts uninitialized if its type requires confirmation.
    pub fn add_node(
        &mut self,
        registry: &NodeRegistry,
        type_name: &str,
        form_data: Map<String, Value>,
    ) -> Result<NodeId> {
        let descriptor = registry.lookup(type_name)?;
        Ok(self.insert_node(Node::new(type_name, descriptor, form_data)))
    }

    /// Inserts a prepared node and returns its ID.
    pub fn insert_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new();
        self.insert_node_with_id(id, node);
        id
    }

    /// Inserts a prepared node with a specific ID.
    pub fn insert_node_with_id(&mut self, id: NodeId, node: Node) {
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        self.index_to_id.insert(index, id);
    }

    /// Removes a node and all its connected edges.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let index = self.node_indices.remove(&id)?;
        self.index_to_id.remove(&index);
        self.graph.remove_node(index)
    }

    /// Returns a reference to a node.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        let index = self.node_indices.get(&id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let index = self.node_indices.get(&id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Returns a node or a [`Error::NodeNotFound`].
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get_node(id).ok_or(Error::NodeNotFound(id))
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    /// Returns an iterator over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.graph.node_indices().filter_map(|index| {
            let id = self.index_to_id.get(&index)?;
            let node = self.graph.node_weight(index)?;
            Some((*id, node))
        })
    }

    /// Returns all node IDs in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).collect()
    }

    /// Returns the start node, if the graph has one.
    pub fn start_node(&self) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.is_start())
            .map(|(id, _)| id)
    }

    /// Finds the primitive node with the given state id.
    pub fn find_by_business_id(&self, business_id: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| {
                node.is_primitive() && node.business_id.as_deref() == Some(business_id)
            })
            .map(|(id, _)| id)
    }

    /// Renames a primitive node's state id.
    ///
    /// Transition references follow automatically on the next compile since
    /// they are derived from edges.
    pub fn rename(&mut self, id: NodeId, business_id: impl Into<String>) -> Result<()> {
        let business_id = business_id.into();
        if let Some(existing) = self.find_by_business_id(&business_id)
            && existing != id
        {
            return Err(Error::DuplicateStateId(business_id));
        }

        let node = self.get_node_mut(id).ok_or(Error::NodeNotFound(id))?;
        node.business_id = Some(business_id);
        Ok(())
    }

    /// Adds an edge between two node ports.
    ///
    /// Fails with [`Error::PortCapacity`] if the output port already carries
    /// an edge and is not a fan-out port. Replacing an edge is the
    /// enforcer's job, not this method's.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        let from_index = self.index_of(edge.from)?;
        let to_index = self.index_of(edge.to)?;

        let source = &self.graph[from_index];
        if !edge.from_port.within(source.outputs) {
            return Err(Error::PortOutOfRange {
                node_id: edge.from,
                port: edge.from_port,
            });
        }
        if !edge.to_port.within(self.graph[to_index].inputs) {
            return Err(Error::PortOutOfRange {
                node_id: edge.to,
                port: edge.to_port,
            });
        }
        if !source.allows_fan_out(edge.from_port)
            && self.edge_on(edge.from, edge.from_port).is_some()
        {
            return Err(Error::PortCapacity {
                node_id: edge.from,
                port: edge.from_port,
            });
        }

        let edge_data = EdgeData {
            from_port: edge.from_port,
            to_port: edge.to_port,
        };
        self.graph.add_edge(from_index, to_index, edge_data);
        Ok(())
    }

    /// Removes an edge, returning whether it existed.
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        let (Some(from), Some(to)) = (
            self.node_indices.get(&edge.from),
            self.node_indices.get(&edge.to),
        ) else {
            return false;
        };

        let found = self
            .graph
            .edges_connecting(*from, *to)
            .find(|edge_ref| {
                edge_ref.weight().from_port == edge.from_port
                    && edge_ref.weight().to_port == edge.to_port
            })
            .map(|edge_ref| edge_ref.id());

        found
            .and_then(|index| self.graph.remove_edge(index))
            .is_some()
    }

    /// Returns whether the exact edge exists.
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.outgoing_edges(edge.from).any(|existing| existing == *edge)
    }

    /// Returns an iterator over all edges.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_indices().filter_map(|index| {
            let (source, target) = self.graph.edge_endpoints(index)?;
            self.to_edge(source, target, self.graph.edge_weight(index)?)
        })
    }

    /// Returns edges originating from a node, oldest first.
    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = Edge> + '_ {
        self.directed_edges(id, Direction::Outgoing).into_iter()
    }

    /// Returns edges targeting a node, oldest first.
    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = Edge> + '_ {
        self.directed_edges(id, Direction::Incoming).into_iter()
    }

    /// Returns the first edge leaving `port` of a node.
    pub fn edge_on(&self, id: NodeId, port: Port) -> Option<Edge> {
        self.outgoing_edges(id).find(|edge| edge.from_port == port)
    }

    /// Returns a node's output ports with the edges leaving each one.
    ///
    /// Every port is present, including unconnected ones.
    pub fn outputs_of(&self, id: NodeId) -> Result<BTreeMap<Port, Vec<Edge>>> {
        let node = self.node(id)?;
        let mut ports: BTreeMap<Port, Vec<Edge>> =
            Port::all(node.outputs).map(|port| (port, Vec::new())).collect();
        for edge in self.outgoing_edges(id) {
            ports.entry(edge.from_port).or_default().push(edge);
        }
        Ok(ports)
    }

    /// Returns a node's input ports with the edges arriving at each one.
    pub fn inputs_of(&self, id: NodeId) -> Result<BTreeMap<Port, Vec<Edge>>> {
        let node = self.node(id)?;
        let mut ports: BTreeMap<Port, Vec<Edge>> =
            Port::all(node.inputs).map(|port| (port, Vec::new())).collect();
        for edge in self.incoming_edges(id) {
            ports.entry(edge.to_port).or_default().push(edge);
        }
        Ok(ports)
    }

    /// Changes the number of output ports of a node.
    ///
    /// Edges leaving removed ports are dropped and returned.
    pub fn resize_outputs(&mut self, id: NodeId, outputs: u16) -> Result<Vec<Edge>> {
        let dropped: Vec<Edge> = self
            .outgoing_edges(id)
            .filter(|edge| !edge.from_port.within(outputs))
            .collect();
        for edge in &dropped {
            self.remove_edge(edge);
        }

        let node = self.get_node_mut(id).ok_or(Error::NodeNotFound(id))?;
        node.outputs = outputs;
        Ok(dropped)
    }

    /// Returns a reference to the underlying petgraph.
    pub fn inner(&self) -> &StableDiGraph<Node, EdgeData> {
        &self.graph
    }

    /// Converts the workflow graph to a serializable definition.
    pub fn to_definition(&self) -> GraphDefinition {
        GraphDefinition {
            nodes: self.nodes().map(|(id, node)| (id, node.clone())).collect(),
            edges: self.edges().collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Creates a workflow graph from a definition.
    ///
    /// Returns an error if any edge references a non-existent node or
    /// breaks port capacity.
    pub fn from_definition(definition: GraphDefinition) -> Result<Self> {
        let mut graph = Self::with_metadata(definition.metadata);

        for (id, node) in definition.nodes {
            graph.insert_node_with_id(id, node);
        }

        for edge in definition.edges {
            graph.add_edge(edge)?;
        }

        Ok(graph)
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_indices
            .get(&id)
            .copied()
            .ok_or(Error::NodeNotFound(id))
    }

    fn directed_edges(&self, id: NodeId, direction: Direction) -> Vec<Edge> {
        let Some(index) = self.node_indices.get(&id) else {
            return Vec::new();
        };

        // petgraph yields a node's adjacency list newest first.
        let mut edges: Vec<Edge> = self
            .graph
            .edges_directed(*index, direction)
            .filter_map(|edge_ref| {
                self.to_edge(edge_ref.source(), edge_ref.target(), edge_ref.weight())
            })
            .collect();
        edges.reverse();
        edges
    }

    fn to_edge(&self, source: NodeIndex, target: NodeIndex, data: &EdgeData) -> Option<Edge> {
        Some(Edge {
            from: *self.index_to_id.get(&source)?,
            from_port: data.from_port,
            to: *self.index_to_id.get(&target)?,
            to_port: data.to_port,
        })
    }
}
