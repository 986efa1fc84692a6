//! Node type registry.
//!
//! A [`NodeRegistry`] maps type names to [`NodeDescriptor`]s: port counts,
//! family, and the hooks the importer and compiler dispatch through. No
//! component branches on a type name; every per-type quirk lives behind
//! one of the [`ImportHook`], [`ExportHook`] or [`ConnectionStrategy`]
//! implementations.

mod builtin;
mod connection;
mod hooks;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub use self::connection::{
    CatchBranches, ConditionalBranches, ConnectionStrategy, EventRace, SingleTransition,
    StartEntry, TransitionSlot,
};
pub use self::hooks::{
    ExportHook, ForeachFields, ImportHook, Passthrough, TransformFields, TransformLocation,
};
use crate::TRACING_TARGET_REGISTRY;
use crate::error::{Error, Result};
use crate::graph::Port;

/// Type name of the start node.
pub const START_NODE_TYPE: &str = "start";

/// Type name of the error-catch node.
pub const CATCH_NODE_TYPE: &str = "error-catch";

/// Coarse node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeFamily {
    /// Start and error-catch nodes; never serialized as a state.
    Special,
    /// Ordinary nodes; always serialized as exactly one state.
    Primitive,
}

/// Static description of a node type.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Node family.
    pub family: NodeFamily,
    /// Number of input ports.
    pub inputs: u16,
    /// Default number of output ports.
    pub outputs: u16,
    /// Whether new nodes start uninitialized.
    pub requires_init: bool,
    /// Output ports that accept more than one edge.
    pub fan_out: Vec<Port>,
    /// Raw state fields to form data.
    pub import_hook: Arc<dyn ImportHook>,
    /// Form data to raw state fields.
    pub export_hook: Arc<dyn ExportHook>,
    /// Output port to transition field mapping.
    pub connections: Arc<dyn ConnectionStrategy>,
}

impl NodeDescriptor {
    /// Describes a primitive type with one input and the outputs its
    /// connection strategy needs for empty fields.
    ///
    /// Hooks default to [`TransformFields::default`].
    pub fn primitive(connections: impl ConnectionStrategy + 'static) -> Self {
        let outputs = connections.ports_for(&serde_json::Map::new());
        Self {
            family: NodeFamily::Primitive,
            inputs: 1,
            outputs,
            requires_init: true,
            fan_out: Vec::new(),
            import_hook: Arc::new(TransformFields::default()),
            export_hook: Arc::new(TransformFields::default()),
            connections: Arc::new(connections),
        }
    }

    /// Describes a special type. Special nodes never require initialization.
    pub fn special(
        inputs: u16,
        outputs: u16,
        connections: impl ConnectionStrategy + 'static,
    ) -> Self {
        Self {
            family: NodeFamily::Special,
            inputs,
            outputs,
            requires_init: false,
            fan_out: Vec::new(),
            import_hook: Arc::new(Passthrough),
            export_hook: Arc::new(Passthrough),
            connections: Arc::new(connections),
        }
    }

    /// Uses `hooks` for both import and export.
    pub fn with_hooks<H>(mut self, hooks: H) -> Self
    where
        H: ImportHook + ExportHook + 'static,
    {
        let hooks = Arc::new(hooks);
        self.import_hook = hooks.clone();
        self.export_hook = hooks;
        self
    }

    /// Declares `port` as a fan-out port.
    pub fn with_fan_out(mut self, port: Port) -> Self {
        if !self.fan_out.contains(&port) {
            self.fan_out.push(port);
        }
        self
    }

    /// Returns whether the type is serialized as a state.
    pub fn is_primitive(&self) -> bool {
        self.family == NodeFamily::Primitive
    }
}

/// Catalog of node types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    types: HashMap<String, NodeDescriptor>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in node types.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Registers a type, returning the descriptor it replaced.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        descriptor: NodeDescriptor,
    ) -> Option<NodeDescriptor> {
        let type_name = type_name.into();
        tracing::trace!(
            target: TRACING_TARGET_REGISTRY,
            type_name = %type_name,
            family = %descriptor.family,
            outputs = descriptor.outputs,
            "Registering node type"
        );

        let replaced = self.types.insert(type_name.clone(), descriptor);
        if replaced.is_some() {
            tracing::debug!(
                target: TRACING_TARGET_REGISTRY,
                type_name = %type_name,
                "Replaced existing node type"
            );
        }
        replaced
    }

    /// Looks up a type, failing with [`Error::UnregisteredType`].
    pub fn lookup(&self, type_name: &str) -> Result<&NodeDescriptor> {
        self.get(type_name)
            .ok_or_else(|| Error::unregistered(type_name))
    }

    /// Returns a type's descriptor, if registered.
    pub fn get(&self, type_name: &str) -> Option<&NodeDescriptor> {
        self.types.get(type_name)
    }

    /// Returns whether a type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Returns all registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_unregistered() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.lookup("noop"),
            Err(Error::UnregisteredType { type_name }) if type_name == "noop"
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = NodeRegistry::new();
        assert!(registry
            .register("custom", NodeDescriptor::primitive(SingleTransition))
            .is_none());
        let replaced = registry.register(
            "custom",
            NodeDescriptor::primitive(SingleTransition).with_fan_out(Port::FIRST),
        );
        assert!(replaced.is_some());
        assert_eq!(registry.lookup("custom").unwrap().fan_out, vec![Port::FIRST]);
    }

    #[test]
    fn test_descriptor_defaults() {
        let primitive = NodeDescriptor::primitive(ConditionalBranches);
        assert!(primitive.requires_init);
        assert_eq!(primitive.inputs, 1);
        assert_eq!(primitive.outputs, 2);

        let special = NodeDescriptor::special(0, 1, StartEntry);
        assert!(!special.requires_init);
        assert!(!special.is_primitive());
    }

    #[test]
    fn test_family_names() {
        assert_eq!(NodeFamily::Primitive.to_string(), "primitive");
        assert_eq!("special".parse::<NodeFamily>().unwrap(), NodeFamily::Special);
    }
}
