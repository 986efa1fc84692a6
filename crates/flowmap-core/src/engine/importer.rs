//! Document to graph import.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::EngineConfig;
use crate::TRACING_TARGET_IMPORT;
use crate::document::{Document, State};
use crate::error::{Error, Result};
use crate::graph::{Edge, GraphMetadata, Node, NodeId, Port, WorkflowGraph};
use crate::registry::{CATCH_NODE_TYPE, NodeDescriptor, NodeRegistry, START_NODE_TYPE};

/// Result of importing a document.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// The populated graph.
    pub graph: WorkflowGraph,
    /// States left out because their type is not registered.
    pub skipped: Vec<SkippedState>,
}

/// A state the importer did not turn into a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedState {
    /// State id.
    pub id: String,
    /// The unregistered type.
    pub type_name: String,
}

/// Lookup key for nodes created during import.
///
/// Catch nodes are keyed by the state owning the catch list, separately
/// from state ids, so they can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    State(String),
    Catch(String),
}

/// Edges of one imported state, wired once every node exists.
struct Pending {
    state_id: String,
    node_id: NodeId,
    error_port: Option<Port>,
    targets: Vec<(Port, String)>,
    catch: Option<(NodeId, Vec<(Port, String)>)>,
}

/// Builds a [`WorkflowGraph`] from a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Importer<'a> {
    registry: &'a NodeRegistry,
    config: &'a EngineConfig,
}

impl<'a> Importer<'a> {
    /// Creates an importer.
    pub fn new(registry: &'a NodeRegistry, config: &'a EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Imports `document`.
    ///
    /// Fails without returning a partial graph if a transition cannot be
    /// resolved, a state id is duplicated or a transform is malformed.
    pub fn import(&self, document: Document) -> Result<ImportReport> {
        let Document {
            extra,
            functions,
            start,
            states,
        } = document;
        check_unique_ids(&states)?;

        let mut graph = WorkflowGraph::with_metadata(GraphMetadata { functions, extra });
        let mut keys = HashMap::new();
        let mut pending = Vec::with_capacity(states.len());
        let mut skipped = Vec::new();

        let start_raw = match start {
            Some(start) => to_map(serde_json::to_value(start)?),
            None => Map::new(),
        };
        let (start_id, entry) = self.add_start(&mut graph, start_raw)?;

        for state in states {
            let Some(descriptor) = self.registry.get(&state.kind) else {
                if !self.config.skip_unregistered {
                    return Err(Error::unregistered(state.kind));
                }
                tracing::warn!(
                    target: TRACING_TARGET_IMPORT,
                    state = %state.id,
                    type_name = %state.kind,
                    "Skipping state of unregistered type"
                );
                skipped.push(SkippedState {
                    id: state.id,
                    type_name: state.kind,
                });
                continue;
            };
            pending.push(self.add_state(&mut graph, &mut keys, descriptor, state)?);
        }

        let entry = match entry {
            Some(target) => Some(resolve(&keys, NodeKey::State(target), START_NODE_TYPE)?),
            None if self.config.entry_fallback => {
                let first = pending.first().map(|state| (state.node_id, &state.state_id));
                if let Some((_, state_id)) = first {
                    tracing::warn!(
                        target: TRACING_TARGET_IMPORT,
                        state = %state_id,
                        "Document names no entry state, falling back to the first state"
                    );
                }
                first.map(|(node_id, _)| node_id)
            }
            None => None,
        };
        if let Some(entry) = entry {
            graph.add_edge(Edge::new(start_id, Port::FIRST, entry))?;
        }

        for state in pending {
            self.wire_state(&mut graph, &keys, state)?;
        }

        tracing::debug!(
            target: TRACING_TARGET_IMPORT,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = skipped.len(),
            "Document imported"
        );

        Ok(ImportReport { graph, skipped })
    }

    /// Creates the start node; returns it with the named entry state.
    fn add_start(
        &self,
        graph: &mut WorkflowGraph,
        mut raw: Map<String, Value>,
    ) -> Result<(NodeId, Option<String>)> {
        let descriptor = self.registry.lookup(START_NODE_TYPE)?;
        let entry = descriptor
            .connections
            .targets(&raw)
            .into_iter()
            .next()
            .map(|(_, target)| target);
        descriptor.connections.strip(&mut raw);

        let form = descriptor.import_hook.import(START_NODE_TYPE, raw)?;
        let mut node = Node::new(START_NODE_TYPE, descriptor, form);
        node.initialized = true;
        Ok((graph.insert_node(node), entry))
    }

    /// Creates the node of one state, plus its catch node.
    fn add_state(
        &self,
        graph: &mut WorkflowGraph,
        keys: &mut HashMap<NodeKey, NodeId>,
        descriptor: &NodeDescriptor,
        state: State,
    ) -> Result<Pending> {
        let State {
            id,
            kind,
            mut fields,
            catch,
        } = state;

        let connections = &descriptor.connections;
        let targets = connections.targets(&fields);
        let outputs = connections.output_count(&fields, descriptor.outputs);
        connections.strip(&mut fields);

        let form = descriptor.import_hook.import(&id, fields)?;
        let mut node = Node::new(kind, descriptor, form).with_business_id(id.clone());
        node.outputs = outputs;
        node.initialized = true;
        let node_id = graph.insert_node(node);
        keys.insert(NodeKey::State(id.clone()), node_id);

        let catch = match catch {
            Some(entries) => {
                let mut raw = Map::new();
                raw.insert("catch".to_owned(), serde_json::to_value(entries)?);
                let (catch_id, catch_targets) = self.add_catch(graph, &id, raw)?;
                keys.insert(NodeKey::Catch(id.clone()), catch_id);
                Some((catch_id, catch_targets))
            }
            None => None,
        };

        Ok(Pending {
            state_id: id,
            node_id,
            error_port: connections.error_port(),
            targets,
            catch,
        })
    }

    fn add_catch(
        &self,
        graph: &mut WorkflowGraph,
        owner: &str,
        mut raw: Map<String, Value>,
    ) -> Result<(NodeId, Vec<(Port, String)>)> {
        let descriptor = self.registry.lookup(CATCH_NODE_TYPE)?;
        let connections = &descriptor.connections;
        let targets = connections.targets(&raw);
        let outputs = connections.output_count(&raw, descriptor.outputs);
        connections.strip(&mut raw);

        let form = descriptor.import_hook.import(owner, raw)?;
        let mut node = Node::new(CATCH_NODE_TYPE, descriptor, form);
        node.outputs = outputs;
        Ok((graph.insert_node(node), targets))
    }

    fn wire_state(
        &self,
        graph: &mut WorkflowGraph,
        keys: &HashMap<NodeKey, NodeId>,
        state: Pending,
    ) -> Result<()> {
        if let Some((catch_id, catch_targets)) = state.catch {
            let error_port = state.error_port.ok_or_else(|| {
                Error::InvalidDefinition(format!(
                    "state {} has a catch list but its type has no error output",
                    state.state_id
                ))
            })?;
            graph.add_edge(Edge::new(state.node_id, error_port, catch_id))?;

            for (port, target) in catch_targets {
                let to = resolve(keys, NodeKey::State(target), &state.state_id)?;
                graph.add_edge(Edge::new(catch_id, port, to))?;
            }
        }

        for (port, target) in state.targets {
            let to = resolve(keys, NodeKey::State(target), &state.state_id)?;
            graph.add_edge(Edge::new(state.node_id, port, to))?;
        }
        Ok(())
    }
}

fn check_unique_ids(states: &[State]) -> Result<()> {
    let mut seen = HashSet::with_capacity(states.len());
    for state in states {
        if !seen.insert(state.id.as_str()) {
            return Err(Error::DuplicateStateId(state.id.clone()));
        }
    }
    Ok(())
}

fn resolve(keys: &HashMap<NodeKey, NodeId>, key: NodeKey, from: &str) -> Result<NodeId> {
    keys.get(&key).copied().ok_or_else(|| {
        let target = match key {
            NodeKey::State(id) | NodeKey::Catch(id) => id,
        };
        Error::unresolved(from, target)
    })
}

fn to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn import(text: &str) -> Result<ImportReport> {
        let registry = NodeRegistry::builtin();
        let config = EngineConfig::default();
        Importer::new(&registry, &config).import(Document::from_yaml(text).unwrap())
    }

    fn node_by_state<'g>(graph: &'g WorkflowGraph, id: &str) -> (NodeId, &'g Node) {
        let node_id = graph.find_by_business_id(id).unwrap();
        (node_id, graph.get_node(node_id).unwrap())
    }

    #[test]
    fn test_import_synthesizes_start_and_catch() {
        let report = import(
            r#"
start:
  state: a
states:
- id: a
  type: noop
  transform: a query
- id: b
  type: noop
  catch:
  - error: E1
    transition: a
"#,
        )
        .unwrap();
        let graph = &report.graph;

        assert_eq!(graph.node_count(), 4);
        let start = graph.start_node().unwrap();
        let (a, a_node) = node_by_state(graph, "a");
        let (b, _) = node_by_state(graph, "b");
        assert_eq!(graph.edge_on(start, Port::FIRST).unwrap().to, a);
        assert_eq!(
            a_node.form_data["transform"],
            json!({"selectionType": "jq", "jqQuery": "a query"})
        );

        let catch = graph.edge_on(b, Port::new(2)).unwrap().to;
        let catch_node = graph.get_node(catch).unwrap();
        assert!(catch_node.is_catch());
        assert_eq!(catch_node.form_data["catch"], json!([{"error": "E1"}]));
        assert_eq!(graph.edge_on(catch, Port::FIRST).unwrap().to, a);
    }

    #[test]
    fn test_switch_branches_become_ports() {
        let report = import(
            r#"
states:
- id: check
  type: switch
  defaultTransition: other
  conditions:
  - condition: jq(.x)
    transition: matched
  - condition: jq(.y)
    transition: other
- id: matched
  type: noop
- id: other
  type: noop
"#,
        )
        .unwrap();
        let graph = &report.graph;
        let (check, node) = node_by_state(graph, "check");
        let (other, _) = node_by_state(graph, "other");
        let (matched, _) = node_by_state(graph, "matched");

        assert_eq!(node.outputs, 4);
        assert!(!node.form_data.contains_key("defaultTransition"));
        assert_eq!(graph.edge_on(check, Port::new(1)).unwrap().to, other);
        assert!(graph.edge_on(check, Port::new(2)).is_none());
        assert_eq!(graph.edge_on(check, Port::new(3)).unwrap().to, matched);
        assert_eq!(graph.edge_on(check, Port::new(4)).unwrap().to, other);
    }

    #[test]
    fn test_entry_falls_back_to_first_state() {
        let report = import(
            r#"
states:
- id: first
  type: noop
- id: second
  type: noop
"#,
        )
        .unwrap();
        let graph = &report.graph;
        let start = graph.start_node().unwrap();
        let (first, _) = node_by_state(graph, "first");
        assert_eq!(graph.edge_on(start, Port::FIRST).unwrap().to, first);
    }

    #[test]
    fn test_entry_fallback_disabled() {
        let registry = NodeRegistry::builtin();
        let config = EngineConfig {
            entry_fallback: false,
            ..Default::default()
        };
        let document = Document::from_yaml("states:\n- id: a\n  type: noop\n").unwrap();
        let report = Importer::new(&registry, &config).import(document).unwrap();
        let start = report.graph.start_node().unwrap();
        assert!(report.graph.edge_on(start, Port::FIRST).is_none());
    }

    #[test]
    fn test_unregistered_states_are_skipped() {
        let report = import(
            r#"
states:
- id: a
  type: teleport
- id: b
  type: noop
"#,
        )
        .unwrap();
        assert_eq!(
            report.skipped,
            vec![SkippedState {
                id: "a".into(),
                type_name: "teleport".into()
            }]
        );
        assert_eq!(report.graph.node_count(), 2);
    }

    #[test]
    fn test_unregistered_states_fail_in_strict_mode() {
        let registry = NodeRegistry::builtin();
        let config = EngineConfig {
            skip_unregistered: false,
            ..Default::default()
        };
        let document = Document::from_yaml("states:\n- id: a\n  type: teleport\n").unwrap();
        let result = Importer::new(&registry, &config).import(document);
        assert!(matches!(result, Err(Error::UnregisteredType { .. })));
    }

    #[test]
    fn test_unresolved_transition_is_fatal() {
        let result = import(
            r#"
states:
- id: a
  type: noop
  transition: missing
"#,
        );
        assert!(matches!(
            result,
            Err(Error::UnresolvedTransition { state, target }) if state == "a" && target == "missing"
        ));
    }

    #[test]
    fn test_unresolved_start_is_fatal() {
        let result = import("start:\n  state: nowhere\nstates:\n- id: a\n  type: noop\n");
        assert!(matches!(result, Err(Error::UnresolvedTransition { .. })));
    }

    #[test]
    fn test_duplicate_state_ids() {
        let result = import("states:\n- id: a\n  type: noop\n- id: a\n  type: delay\n");
        assert!(matches!(result, Err(Error::DuplicateStateId(id)) if id == "a"));
    }

    #[test]
    fn test_passthrough_fields_kept() {
        let report = import(
            r#"
description: kept
functions:
- id: f
  type: knative-workflow
states:
- id: a
  type: noop
"#,
        )
        .unwrap();
        let metadata = &report.graph.metadata;
        assert_eq!(metadata.extra.get("description"), Some(&json!("kept")));
        assert_eq!(metadata.functions.as_ref().map(Vec::len), Some(1));
    }
}
