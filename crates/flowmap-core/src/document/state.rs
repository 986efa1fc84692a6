//! State records of a workflow document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One state of a workflow document.
///
/// Only `id`, `type` and `catch` are modelled; every other field is kept
/// as-is in [`State::fields`] and interpreted by the node type registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Unique state id.
    pub id: String,
    /// State type discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific fields, including transition fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Ordered error handlers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<CatchEntry>>,
}

impl State {
    /// Creates a state with no fields.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            fields: Map::new(),
            catch: None,
        }
    }

    /// Sets a field, returning the state.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets the catch list, returning the state.
    pub fn with_catch(mut self, catch: Vec<CatchEntry>) -> Self {
        self.catch = Some(catch);
        self
    }

    /// Returns the plain `transition` field, if set.
    pub fn transition(&self) -> Option<&str> {
        self.fields.get("transition").and_then(Value::as_str)
    }
}

/// A single error handler of a state's `catch` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchEntry {
    /// Glob pattern matched against the error code.
    pub error: String,
    /// State to transition to when the pattern matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    /// Any other fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatchEntry {
    /// Creates a catch entry.
    pub fn new(error: impl Into<String>, transition: Option<String>) -> Self {
        Self {
            error: error.into(),
            transition,
            extra: Map::new(),
        }
    }
}
