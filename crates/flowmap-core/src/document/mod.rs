//! Workflow document types.
//!
//! The document is the durable, declarative form of a workflow: an ordered
//! list of [`State`]s, an optional [`Start`] block, an optional functions
//! catalog, and any other top-level keys, which are carried through
//! untouched.

mod start;
mod state;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use self::start::{Start, StartKind};
pub use self::state::{CatchEntry, State};
use crate::error::Result;
use crate::transform::script;

/// Placeholder prefix used while serializing scripts.
const SCRIPT_PLACEHOLDER: &str = "__flowmap_script_";

/// A declarative workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Top-level keys the editor does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Function catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    /// Start block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Start>,
    /// Ordered states.
    #[serde(default)]
    pub states: Vec<State>,
}

impl Document {
    /// Parses a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parses a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the document as YAML.
    ///
    /// Scripts embedded in states are written as block literals whose lines
    /// are indented `indent` columns past their key. Top-level passthrough
    /// keys are written as they are.
    pub fn to_yaml(&self, indent: usize) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        let mut scripts = Vec::new();
        if let Some(states) = value.get_mut("states") {
            stash_scripts(states, &mut scripts);
        }

        let text = serde_yaml::to_string(&value)?;
        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            out.push_str(&splice_script(line, &scripts, indent)?);
        }
        Ok(out)
    }

    /// Serializes the document as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the state with the given id.
    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.iter().find(|state| state.id == id)
    }
}

fn placeholder(index: usize) -> String {
    format!("{SCRIPT_PLACEHOLDER}{index}__")
}

/// Replaces every wrapped script string with a placeholder scalar.
///
/// The YAML emitter picks its own quoting style; placeholders let the
/// scripts be spliced back as single-line double-quoted scalars, the form
/// the block rewrite expects.
fn stash_scripts(value: &mut Value, scripts: &mut Vec<String>) {
    match value {
        Value::String(text) if script::is_wrapped(text) => {
            let original = std::mem::replace(text, placeholder(scripts.len()));
            scripts.push(original);
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| stash_scripts(item, scripts)),
        Value::Object(map) => map
            .values_mut()
            .for_each(|item| stash_scripts(item, scripts)),
        _ => {}
    }
}

/// Puts the script stashed under a placeholder in `line` back.
///
/// The script is written as a double-quoted scalar, then rewritten as a
/// block literal when it fits one.
fn splice_script(line: &str, scripts: &[String], indent: usize) -> Result<String> {
    let Some(at) = line.find(SCRIPT_PLACEHOLDER) else {
        return Ok(line.to_owned());
    };
    let rest = &line[at + SCRIPT_PLACEHOLDER.len()..];
    let Some(end) = rest.find("__") else {
        return Ok(line.to_owned());
    };
    let Some(script) = rest[..end].parse::<usize>().ok().and_then(|i| scripts.get(i)) else {
        return Ok(line.to_owned());
    };

    let quoted = serde_json::to_string(script)?;
    let spliced = format!("{}{quoted}{}", &line[..at], &rest[end + 2..]);
    let newline = if spliced.ends_with('\n') { "\n" } else { "" };
    let content = spliced.trim_end_matches('\n');

    match script::expand_line(content, indent) {
        Some(block) => Ok(block + newline),
        None => Ok(spliced),
    }
}
