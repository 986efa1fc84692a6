//! Transform value codec.
//!
//! Transform fields carry a data-transformation expression in one of four
//! encodings. The document side is untagged and decoded by shape (see
//! [`shape`]); the editor side is a [`TransformSelection`] tagged with an
//! explicit `selectionType`, and encoding is keyed strictly off that tag.

pub mod script;
pub mod shape;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use self::shape::Shape;

/// A transform value that could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transform at {path}: {message}")]
pub struct CodecError {
    /// Field path of the offending value, e.g. `check.conditions[1].transform`.
    pub path: String,
    /// What went wrong.
    pub message: String,
}

impl CodecError {
    /// Creates a new codec error.
    pub fn new(path: impl Into<String>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Editor-side representation of a transform field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "selectionType")]
pub enum TransformSelection {
    /// A jq query expression.
    #[serde(rename = "jq")]
    Jq {
        /// The query text.
        #[serde(rename = "jqQuery")]
        query: String,
    },
    /// A flat key/value mapping.
    #[serde(rename = "key-value")]
    KeyValue {
        /// The mapping entries.
        #[serde(rename = "keyValue")]
        entries: Map<String, Value>,
    },
    /// Arbitrary structured data kept as YAML text.
    #[serde(rename = "yaml")]
    Yaml {
        /// The YAML block.
        #[serde(rename = "rawYAML")]
        raw: String,
    },
    /// An embedded script body, without the wrapper markers.
    #[serde(rename = "js")]
    Js {
        /// The script body.
        #[serde(rename = "jsQuery")]
        script: String,
    },
}

impl TransformSelection {
    /// Returns the `selectionType` tag of this variant.
    pub const fn selection_type(&self) -> &'static str {
        match self {
            Self::Jq { .. } => "jq",
            Self::KeyValue { .. } => "key-value",
            Self::Yaml { .. } => "yaml",
            Self::Js { .. } => "js",
        }
    }
}

/// Decodes a document-side value into an editor selection.
///
/// Returns `None` for empty values, which means the field is omitted.
pub fn decode(value: &Value, path: &str) -> Result<Option<TransformSelection>, CodecError> {
    let selection = match shape::classify(value) {
        Shape::Empty => return Ok(None),
        Shape::Script(body) => TransformSelection::Js {
            script: body.to_owned(),
        },
        Shape::Structure(value) => TransformSelection::Yaml {
            raw: serde_yaml::to_string(value).map_err(|e| CodecError::new(path, e))?,
        },
        Shape::Flat(entries) => TransformSelection::KeyValue {
            entries: entries.clone(),
        },
        Shape::Query(query) => TransformSelection::Jq {
            query: query.to_owned(),
        },
    };
    Ok(Some(selection))
}

/// Encodes an editor selection into its document-side value.
///
/// Returns `None` when the encoded value is empty.
pub fn encode(selection: &TransformSelection, path: &str) -> Result<Option<Value>, CodecError> {
    let value = match selection {
        TransformSelection::Jq { query } => Value::String(query.clone()),
        TransformSelection::KeyValue { entries } => Value::Object(entries.clone()),
        TransformSelection::Yaml { raw } if raw.trim().is_empty() => return Ok(None),
        TransformSelection::Yaml { raw } => {
            serde_yaml::from_str(raw).map_err(|e| CodecError::new(path, e))?
        }
        TransformSelection::Js { script: body } => Value::String(script::wrap(body)),
    };
    Ok((!is_empty(&value)).then_some(value))
}

/// Decodes `fields[key]` in place, dropping the key when it is empty.
pub fn decode_field(
    fields: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<(), CodecError> {
    let Some(value) = fields.get(key) else {
        return Ok(());
    };

    match decode(value, path)? {
        Some(selection) => {
            let value = serde_json::to_value(selection).map_err(|e| CodecError::new(path, e))?;
            fields.insert(key.to_owned(), value);
        }
        None => {
            fields.shift_remove(key);
        }
    }
    Ok(())
}

/// Encodes `fields[key]` in place, dropping the key when it is empty.
pub fn encode_field(
    fields: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<(), CodecError> {
    let Some(value) = fields.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        fields.shift_remove(key);
        return Ok(());
    }

    let selection = TransformSelection::deserialize(value)
        .map_err(|e| CodecError::new(path, format!("expected a transform selection: {e}")))?;
    match encode(&selection, path)? {
        Some(value) => {
            fields.insert(key.to_owned(), value);
        }
        None => {
            fields.shift_remove(key);
        }
    }
    Ok(())
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
