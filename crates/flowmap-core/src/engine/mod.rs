//! Import, compile and edge enforcement.
//!
//! This module provides the two directions of the workflow compiler:
//! - [`Engine`]: facade owning a configuration and a node registry
//! - [`Importer`]: document to graph
//! - [`Compiler`]: graph to document
//! - [`EdgeEnforcer`]: port rules for editor-created edges
//! - [`EngineConfig`]: configuration options

mod compiler;
mod config;
mod enforcer;
mod importer;

pub use self::compiler::Compiler;
pub use self::config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use self::enforcer::{EdgeEnforcer, InvalidConnection, Verdict};
pub use self::importer::{ImportReport, Importer, SkippedState};
use crate::TRACING_TARGET_ENGINE;
use crate::document::Document;
use crate::error::Result;
use crate::graph::{Edge, WorkflowGraph};
use crate::registry::NodeRegistry;

/// The workflow compiler.
///
/// Holds the configuration and node registry shared by every import,
/// compile and connection check.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    registry: NodeRegistry,
}

impl Engine {
    /// Creates a new engine.
    pub fn new(config: EngineConfig, registry: NodeRegistry) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_ENGINE,
            node_types = registry.len(),
            script_indent = config.script_indent,
            entry_fallback = config.entry_fallback,
            skip_unregistered = config.skip_unregistered,
            "Workflow engine initialized"
        );

        Self { config, registry }
    }

    /// Creates a new engine with default configuration and built-in types.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), NodeRegistry::builtin())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the node registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Returns a mutable reference to the node registry.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Imports a document into a new graph.
    pub fn import(&self, document: Document) -> Result<ImportReport> {
        Importer::new(&self.registry, &self.config).import(document)
    }

    /// Parses and imports a YAML document.
    pub fn import_yaml(&self, text: &str) -> Result<ImportReport> {
        self.import(Document::from_yaml(text)?)
    }

    /// Compiles a graph into a document.
    pub fn compile(&self, graph: &WorkflowGraph) -> Result<Document> {
        Compiler::new(&self.registry).compile(graph)
    }

    /// Compiles a graph into YAML text.
    pub fn compile_yaml(&self, graph: &WorkflowGraph) -> Result<String> {
        self.compile(graph)?.to_yaml(self.config.script_indent)
    }

    /// Returns an edge enforcer bound to this engine's registry.
    pub fn enforcer(&self) -> EdgeEnforcer<'_> {
        EdgeEnforcer::new(&self.registry)
    }

    /// Adds an editor-created edge through the enforcer.
    pub fn connect(&self, graph: &mut WorkflowGraph, edge: Edge) -> Result<Verdict> {
        self.enforcer().connect(graph, edge)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::State;
    use crate::graph::Port;
    use crate::transform::script;

    const ROUND_TRIP: &str = r#"
description: order processing
functions:
- id: charge
  image: example/charge:v1
  type: knative-workflow
start:
  type: scheduled
  cron: "0 0 * * *"
  state: fetch
states:
- id: fetch
  type: action
  action:
    function: charge
    input:
      order: jq(.order)
      retry: "false"
  transform:
    result:
      total: 10
      items:
      - a
      - b
  transition: route
  catch:
  - error: "io.*"
    transition: failed
  - error: "*"
- id: route
  type: switch
  defaultTransform: .
  conditions:
  - condition: jq(.total > 5)
    transition: big
    transform: "js(return data.total)"
  - condition: jq(.total <= 5)
    transition: small
  defaultTransition: small
- id: big
  type: eventXor
  events:
  - event:
      type: approved
    transition: small
  - event:
      type: rejected
    transition: failed
- id: small
  type: foreach
  array: jq(.items)
  action:
    function: charge
    retries:
      max_attempts: 3
  transition: done
- id: done
  type: noop
- id: failed
  type: error
  error: order.failed
  message: order could not be processed
"#;

    fn round_trip(text: &str) -> (Document, Document) {
        let engine = Engine::with_defaults();
        let original = Document::from_yaml(text).unwrap();
        let report = engine.import(original.clone()).unwrap();
        assert!(report.skipped.is_empty());
        let compiled = engine.compile(&report.graph).unwrap();
        (original, compiled)
    }

    fn sorted(document: &Document) -> Vec<State> {
        let mut states = document.states.clone();
        states.sort_by(|a, b| a.id.cmp(&b.id));
        states
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let (original, compiled) = round_trip(ROUND_TRIP);
        assert_eq!(compiled.start, original.start);
        assert_eq!(compiled.functions, original.functions);
        assert_eq!(compiled.extra, original.extra);
        assert_eq!(sorted(&compiled), sorted(&original));
        assert_eq!(compiled.states[0].id, "fetch");
    }

    #[test]
    fn test_round_trip_through_yaml_text() {
        let engine = Engine::with_defaults();
        let report = engine.import_yaml(ROUND_TRIP).unwrap();
        let text = engine.compile_yaml(&report.graph).unwrap();
        assert!(text.contains("transform: |-\n"));

        let again = engine.import_yaml(&text).unwrap();
        let recompiled = engine.compile(&again.graph).unwrap();
        let original = Document::from_yaml(ROUND_TRIP).unwrap();
        assert_eq!(sorted(&recompiled), sorted(&original));
    }

    #[test]
    fn test_non_transform_scripts_survive_yaml_text() {
        let source = r#"
start:
  state: route
states:
- id: route
  type: switch
  conditions:
  - condition: js(return true)
    transition: done
  defaultTransition: done
- id: done
  type: noop
  transform: .msg + "js(x"
"#;
        let engine = Engine::with_defaults();
        let report = engine.import_yaml(source).unwrap();
        let text = engine.compile_yaml(&report.graph).unwrap();

        let again = engine.import_yaml(&text).unwrap();
        let recompiled = engine.compile(&again.graph).unwrap();
        let original = Document::from_yaml(source).unwrap();
        assert_eq!(sorted(&recompiled), sorted(&original));
        assert_eq!(
            recompiled.state("route").unwrap().fields["conditions"][0]["condition"],
            json!("js(return true)")
        );
        assert_eq!(
            recompiled.state("done").unwrap().fields["transform"],
            json!(".msg + \"js(x\"")
        );
    }

    #[test]
    fn test_singleton_retries_export_as_record() {
        let (_, compiled) = round_trip(
            r#"
states:
- id: loop
  type: foreach
  action:
    function: f
    retries:
    - max_attempts: 2
"#,
        );
        assert_eq!(
            compiled.states[0].fields["action"]["retries"],
            json!({"max_attempts": 2})
        );
    }

    #[test]
    fn test_catch_scenario() {
        let engine = Engine::with_defaults();
        let mut report = engine
            .import_yaml(
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
        let graph = &mut report.graph;
        assert_eq!(graph.node_count(), 4);

        let a = graph.find_by_business_id("a").unwrap();
        let b = graph.find_by_business_id("b").unwrap();
        let catch = graph.edge_on(b, Port::new(2)).unwrap().to;

        assert_eq!(
            engine.connect(graph, Edge::new(a, Port::FIRST, b)).unwrap(),
            Verdict::Accept
        );
        assert_eq!(
            engine.connect(graph, Edge::new(a, Port::new(2), catch)).unwrap(),
            Verdict::Accept
        );

        let document = engine.compile(graph).unwrap();
        let b_state = document.state("b").unwrap();
        let entries = b_state.catch.as_ref().unwrap();
        assert_eq!(entries[0].error, "E1");
        assert_eq!(entries[0].transition.as_deref(), Some("a"));
        assert_eq!(document.state("a").unwrap().transition(), Some("b"));
        assert_eq!(document.state("a").unwrap().fields["transform"], json!("a query"));
    }

    #[test]
    fn test_rename_propagates_to_transitions() {
        let engine = Engine::with_defaults();
        let mut report = engine
            .import_yaml(
                r#"
start:
  state: a
states:
- id: a
  type: noop
  transition: b
- id: b
  type: noop
"#,
            )
            .unwrap();
        let b = report.graph.find_by_business_id("b").unwrap();
        report.graph.rename(b, "renamed").unwrap();

        let document = engine.compile(&report.graph).unwrap();
        assert_eq!(document.state("a").unwrap().transition(), Some("renamed"));
    }

    #[test]
    fn test_script_survives_round_trip() {
        let engine = Engine::with_defaults();
        let body = "const label = \"total\";\nreturn { [label]: data.total }";
        let text = format!(
            "start:\n  state: a\nstates:\n- id: a\n  type: noop\n  transform: {}\n",
            serde_json::to_string(&script::wrap(body)).unwrap()
        );

        let report = engine.import_yaml(&text).unwrap();
        let a = report.graph.find_by_business_id("a").unwrap();
        assert_eq!(
            report.graph.get_node(a).unwrap().form_data["transform"],
            json!({"selectionType": "js", "jsQuery": body})
        );

        let yaml = engine.compile_yaml(&report.graph).unwrap();
        let reparsed = Document::from_yaml(&yaml).unwrap();
        let transform = reparsed.states[0].fields["transform"].as_str().unwrap();
        assert_eq!(script::unwrap(transform), Some(body));
    }
}
