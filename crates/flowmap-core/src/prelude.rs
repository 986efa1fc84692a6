//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use flowmap_core::prelude::*;
//! ```

pub use crate::document::{CatchEntry, Document, Start, StartKind, State};
pub use crate::engine::{
    Compiler, EdgeEnforcer, Engine, EngineConfig, EngineConfigBuilder, ImportReport, Importer,
    InvalidConnection, SkippedState, Verdict,
};
pub use crate::error::{Error, Result};
pub use crate::graph::{Edge, GraphDefinition, GraphMetadata, Node, NodeId, Port, WorkflowGraph};
pub use crate::registry::{NodeDescriptor, NodeFamily, NodeRegistry};
pub use crate::transform::{CodecError, TransformSelection};
