//! Built-in node types.

use super::TransformLocation::{EachIn, Field, Nested};
use super::{
    CATCH_NODE_TYPE, CatchBranches, ConditionalBranches, EventRace, ForeachFields,
    NodeDescriptor, NodeRegistry, START_NODE_TYPE, SingleTransition, StartEntry,
    TransformFields,
};

/// Types that only carry the top-level `transform` field.
const PLAIN_TYPES: &[&str] = &[
    "noop",
    "consumeEvent",
    "delay",
    "error",
    "eventAnd",
    "generateEvent",
    "getter",
    "setter",
    "validate",
];

/// Registers every built-in type into `registry`.
pub(super) fn register_all(registry: &mut NodeRegistry) {
    registry.register(START_NODE_TYPE, NodeDescriptor::special(0, 1, StartEntry));
    registry.register(CATCH_NODE_TYPE, NodeDescriptor::special(1, 1, CatchBranches));

    for type_name in PLAIN_TYPES {
        registry.register(*type_name, NodeDescriptor::primitive(SingleTransition));
    }

    registry.register(
        "action",
        NodeDescriptor::primitive(SingleTransition)
            .with_hooks(TransformFields::new([Field("transform"), Nested("action", "input")])),
    );
    registry.register(
        "switch",
        NodeDescriptor::primitive(ConditionalBranches).with_hooks(TransformFields::new([
            Field("defaultTransform"),
            EachIn("conditions", "transform"),
        ])),
    );
    registry.register(
        "eventXor",
        NodeDescriptor::primitive(EventRace)
            .with_hooks(TransformFields::new([EachIn("events", "transform")])),
    );
    registry.register(
        "foreach",
        NodeDescriptor::primitive(SingleTransition)
            .with_hooks(ForeachFields::new([Field("transform"), Nested("action", "input")])),
    );
    registry.register(
        "parallel",
        NodeDescriptor::primitive(SingleTransition)
            .with_hooks(TransformFields::new([Field("transform"), EachIn("actions", "input")])),
    );
}
