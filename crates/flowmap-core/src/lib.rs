#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod document;
pub mod engine;
mod error;
pub mod graph;
pub mod registry;
pub mod transform;

#[doc(hidden)]
pub mod prelude;

pub use error::{Error, Result};

/// Tracing target for engine lifecycle events.
pub const TRACING_TARGET_ENGINE: &str = "flowmap_core::engine";

/// Tracing target for document import.
pub const TRACING_TARGET_IMPORT: &str = "flowmap_core::import";

/// Tracing target for graph compilation.
pub const TRACING_TARGET_COMPILE: &str = "flowmap_core::compile";

/// Tracing target for edge enforcement.
pub const TRACING_TARGET_ENFORCE: &str = "flowmap_core::enforce";

/// Tracing target for node type registration.
pub const TRACING_TARGET_REGISTRY: &str = "flowmap_core::registry";
