//! Graph to document compilation.
//!
//! # Compilation Process
//!
//! 1. **Validation**: every node initialized, typed and uniquely named
//! 2. **Start**: build the start block from the start node
//! 3. **Walk**: post-order visit from the entry state, each state emitted once
//! 4. **Order**: reverse the walk, then append the post-order visit of
//!    every unconnected root state
//! 5. **Merge**: restore the passthrough document fields

use std::collections::HashSet;

use serde_json::Value;

use crate::TRACING_TARGET_COMPILE;
use crate::document::{CatchEntry, Document, Start, State};
use crate::error::{Error, Result};
use crate::graph::{Node, NodeId, Port, WorkflowGraph};
use crate::registry::{NodeRegistry, START_NODE_TYPE, TransitionSlot};

/// Compiles a [`WorkflowGraph`] into a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler.
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    /// Compiles `graph`.
    ///
    /// No partial document is ever returned: the first failure aborts,
    /// except uninitialized nodes, which are all reported together.
    pub fn compile(&self, graph: &WorkflowGraph) -> Result<Document> {
        self.validate(graph)?;

        let start_id = graph.start_node().ok_or(Error::MissingStartNode)?;
        let entry = graph
            .edge_on(start_id, Port::FIRST)
            .map(|edge| edge.to)
            .ok_or(Error::MissingEntryState)?;
        let start = self.compile_start(graph, start_id, entry)?;

        let mut walk = Walk {
            graph,
            registry: self.registry,
            visited: HashSet::new(),
            states: Vec::new(),
        };
        walk.visit(entry)?;
        walk.states.reverse();

        for (id, node) in graph.nodes() {
            if !node.is_primitive() || walk.visited.contains(&id) {
                continue;
            }
            if graph.incoming_edges(id).next().is_some() {
                continue;
            }
            walk.visit(id)?;
        }

        for (id, node) in graph.nodes() {
            if node.is_primitive() && !walk.visited.contains(&id) {
                tracing::warn!(
                    target: TRACING_TARGET_COMPILE,
                    state = %node.label(id),
                    "Dropping state that is neither reachable nor a root"
                );
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_COMPILE,
            states = walk.states.len(),
            "Graph compiled"
        );

        Ok(Document {
            extra: graph.metadata.extra.clone(),
            functions: graph.metadata.functions.clone(),
            start: Some(start),
            states: walk.states,
        })
    }

    /// Checks every node before anything is emitted.
    fn validate(&self, graph: &WorkflowGraph) -> Result<()> {
        let uninitialized: Vec<String> = graph
            .nodes()
            .filter(|(_, node)| !node.initialized)
            .map(|(id, node)| node.label(id))
            .collect();
        if !uninitialized.is_empty() {
            return Err(Error::UninitializedNodes(uninitialized));
        }

        let mut names = HashSet::new();
        for (id, node) in graph.nodes() {
            self.registry.lookup(&node.type_name)?;
            if !node.is_primitive() {
                continue;
            }
            let name = node.business_id.as_deref().ok_or(Error::MissingStateId(id))?;
            if !names.insert(name) {
                return Err(Error::DuplicateStateId(name.to_owned()));
            }
        }
        Ok(())
    }

    fn compile_start(
        &self,
        graph: &WorkflowGraph,
        start_id: NodeId,
        entry: NodeId,
    ) -> Result<Start> {
        let start = graph.node(start_id)?;
        let entry_state = state_name(graph, entry)?;

        let descriptor = self.registry.lookup(&start.type_name)?;
        let mut form = start.form_data.clone();
        descriptor.connections.strip(&mut form);
        let form = descriptor.export_hook.export(START_NODE_TYPE, form)?;

        Start::from_form(&form, entry_state).map_err(Error::InvalidDefinition)
    }
}

/// Depth-first emission state.
struct Walk<'g> {
    graph: &'g WorkflowGraph,
    registry: &'g NodeRegistry,
    visited: HashSet<NodeId>,
    states: Vec<State>,
}

impl<'g> Walk<'g> {
    /// Emits `id` after everything it transitions to.
    fn visit(&mut self, id: NodeId) -> Result<()> {
        if !self.visited.insert(id) {
            return Ok(());
        }

        let graph = self.graph;
        let node = graph.node(id)?;
        let state_id = state_name(graph, id)?;
        let descriptor = self.registry.lookup(&node.type_name)?;

        let mut fields = node.form_data.clone();
        descriptor.connections.strip(&mut fields);
        let mut catch = None;

        for (port, edges) in graph.outputs_of(id)? {
            let Some(edge) = edges.first() else {
                continue;
            };
            let target = graph.node(edge.to)?;

            match descriptor.connections.slot(port) {
                Some(TransitionSlot::Error) if target.is_catch() => {
                    catch = Some(self.catch_entries(edge.to, &state_id)?);
                }
                Some(slot) if slot != TransitionSlot::Error && target.is_primitive() => {
                    let name = state_name(graph, edge.to)?;
                    if !slot.write(&mut fields, &name) {
                        return Err(Error::DanglingPort {
                            state: state_id,
                            port,
                        });
                    }
                    for edge in &edges {
                        self.visit(edge.to)?;
                    }
                }
                Some(_) => {
                    return Err(Error::InvalidDefinition(format!(
                        "output {port} of state {state_id} cannot lead to {} node {}",
                        target.type_name,
                        target.label(edge.to)
                    )));
                }
                None => {
                    return Err(Error::DanglingPort {
                        state: state_id,
                        port,
                    });
                }
            }
        }

        let fields = descriptor.export_hook.export(&state_id, fields)?;
        tracing::trace!(
            target: TRACING_TARGET_COMPILE,
            state = %state_id,
            type_name = %node.type_name,
            "Emitting state"
        );
        self.states.push(State {
            id: state_id,
            kind: node.type_name.clone(),
            fields,
            catch: catch.filter(|entries: &Vec<CatchEntry>| !entries.is_empty()),
        });
        Ok(())
    }

    /// Rebuilds the catch list of `owner` from an error-catch node.
    fn catch_entries(&mut self, catch_id: NodeId, owner: &str) -> Result<Vec<CatchEntry>> {
        let graph = self.graph;
        let node = graph.node(catch_id)?;
        let descriptor = self.registry.lookup(&node.type_name)?;

        let mut form = node.form_data.clone();
        descriptor.connections.strip(&mut form);

        for (port, edges) in graph.outputs_of(catch_id)? {
            let Some(edge) = edges.first() else {
                continue;
            };
            let name = state_name(graph, edge.to)?;
            let written = descriptor
                .connections
                .slot(port)
                .is_some_and(|slot| slot.write(&mut form, &name));
            if !written {
                return Err(Error::DanglingPort {
                    state: owner.to_owned(),
                    port,
                });
            }
            for edge in &edges {
                self.visit(edge.to)?;
            }
        }

        let mut form = descriptor.export_hook.export(owner, form)?;
        match form.shift_remove("catch") {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(entries) => Ok(serde_json::from_value(entries)?),
        }
    }
}

/// Returns the state id of a primitive node.
fn state_name(graph: &WorkflowGraph, id: NodeId) -> Result<String> {
    let node: &Node = graph.node(id)?;
    if !node.is_primitive() {
        return Err(Error::InvalidDefinition(format!(
            "{} is not a state",
            node.label(id)
        )));
    }
    node.business_id.clone().ok_or(Error::MissingStateId(id))
}
