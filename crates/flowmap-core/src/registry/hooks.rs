//! Per-type field normalization hooks.

use std::fmt;

use serde_json::{Map, Value};

use crate::transform::{self, CodecError};

/// Converts raw state fields into editor form data.
pub trait ImportHook: fmt::Debug + Send + Sync {
    /// Normalizes the fields of the state `state_id`.
    fn import(
        &self,
        state_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError>;
}

/// Converts editor form data back into raw state fields.
pub trait ExportHook: fmt::Debug + Send + Sync {
    /// Denormalizes the form data of the state `state_id`.
    fn export(
        &self,
        state_id: &str,
        form: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError>;
}

type FieldCodec = fn(&mut Map<String, Value>, &str, &str) -> Result<(), CodecError>;

/// Where a transform-bearing field lives inside a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformLocation {
    /// A top-level field.
    Field(&'static str),
    /// A field of a nested record, e.g. `action.input`.
    Nested(&'static str, &'static str),
    /// A field of every entry of a list, e.g. `conditions[].transform`.
    EachIn(&'static str, &'static str),
}

impl TransformLocation {
    fn apply(
        self,
        fields: &mut Map<String, Value>,
        state_id: &str,
        codec: FieldCodec,
    ) -> Result<(), CodecError> {
        match self {
            Self::Field(key) => codec(fields, key, &format!("{state_id}.{key}")),
            Self::Nested(outer, key) => match fields.get_mut(outer).and_then(Value::as_object_mut) {
                Some(record) => codec(record, key, &format!("{state_id}.{outer}.{key}")),
                None => Ok(()),
            },
            Self::EachIn(list, key) => {
                let Some(items) = fields.get_mut(list).and_then(Value::as_array_mut) else {
                    return Ok(());
                };
                for (index, item) in items.iter_mut().enumerate() {
                    if let Some(entry) = item.as_object_mut() {
                        codec(entry, key, &format!("{state_id}.{list}[{index}].{key}"))?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Applies the transform codec to a fixed list of locations and passes
/// every other field through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFields {
    locations: Vec<TransformLocation>,
}

impl TransformFields {
    /// Creates a hook covering `locations`.
    pub fn new(locations: impl IntoIterator<Item = TransformLocation>) -> Self {
        Self {
            locations: locations.into_iter().collect(),
        }
    }

    /// Returns the covered locations.
    pub fn locations(&self) -> &[TransformLocation] {
        &self.locations
    }

    fn apply(
        &self,
        state_id: &str,
        fields: &mut Map<String, Value>,
        codec: FieldCodec,
    ) -> Result<(), CodecError> {
        self.locations
            .iter()
            .try_for_each(|location| location.apply(fields, state_id, codec))
    }
}

impl Default for TransformFields {
    /// Covers the single top-level `transform` field.
    fn default() -> Self {
        Self::new([TransformLocation::Field("transform")])
    }
}

impl ImportHook for TransformFields {
    fn import(
        &self,
        state_id: &str,
        mut fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError> {
        self.apply(state_id, &mut fields, transform::decode_field)?;
        Ok(fields)
    }
}

impl ExportHook for TransformFields {
    fn export(
        &self,
        state_id: &str,
        mut form: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError> {
        self.apply(state_id, &mut form, transform::encode_field)?;
        Ok(form)
    }
}

/// Loop states: transforms plus retry policy normalization.
///
/// A retry policy written as a one-element list is imported as a plain
/// record and exported in record form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeachFields {
    transforms: TransformFields,
}

impl ForeachFields {
    /// Creates a hook covering `locations`.
    pub fn new(locations: impl IntoIterator<Item = TransformLocation>) -> Self {
        Self {
            transforms: TransformFields::new(locations),
        }
    }
}

impl ImportHook for ForeachFields {
    fn import(
        &self,
        state_id: &str,
        mut fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError> {
        if let Some(retries) = fields
            .get_mut("action")
            .and_then(Value::as_object_mut)
            .and_then(|action| action.get_mut("retries"))
        {
            let single = match retries {
                Value::Array(items) if items.len() == 1 => items.pop(),
                _ => None,
            };
            if let Some(policy) = single {
                *retries = policy;
            }
        }
        self.transforms.import(state_id, fields)
    }
}

impl ExportHook for ForeachFields {
    fn export(
        &self,
        state_id: &str,
        form: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError> {
        self.transforms.export(state_id, form)
    }
}

/// Leaves fields untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ImportHook for Passthrough {
    fn import(
        &self,
        _state_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError> {
        Ok(fields)
    }
}

impl ExportHook for Passthrough {
    fn export(
        &self,
        _state_id: &str,
        form: Map<String, Value>,
    ) -> Result<Map<String, Value>, CodecError> {
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_hook_decodes_transform() {
        let hook = TransformFields::default();
        let form = hook
            .import("a", fields(json!({"transform": "a query", "log": "x"})))
            .unwrap();
        assert_eq!(
            Value::Object(form.clone()),
            json!({"transform": {"selectionType": "jq", "jqQuery": "a query"}, "log": "x"})
        );

        let raw = hook.export("a", form).unwrap();
        assert_eq!(Value::Object(raw), json!({"transform": "a query", "log": "x"}));
    }

    #[test]
    fn test_each_in_reports_path() {
        let hook = TransformFields::new([TransformLocation::EachIn("conditions", "transform")]);
        let form = fields(json!({
            "conditions": [
                {"condition": "true"},
                {"condition": "false", "transform": {"selectionType": "yaml", "rawYAML": "a: [b"}},
            ],
        }));

        let error = hook.export("check", form).unwrap_err();
        assert_eq!(error.path, "check.conditions[1].transform");
    }

    #[test]
    fn test_nested_location() {
        let hook = TransformFields::new([TransformLocation::Nested("action", "input")]);
        let form = hook
            .import("run", fields(json!({"action": {"function": "f", "input": {"a": 1}}})))
            .unwrap();
        assert_eq!(
            form["action"]["input"],
            json!({"selectionType": "key-value", "keyValue": {"a": 1}})
        );
    }

    #[test]
    fn test_foreach_unwraps_single_retry_policy() {
        let hook = ForeachFields::new([TransformLocation::Field("transform")]);
        let form = hook
            .import(
                "loop",
                fields(json!({"action": {"function": "f", "retries": [{"max_attempts": 3}]}})),
            )
            .unwrap();
        assert_eq!(form["action"]["retries"], json!({"max_attempts": 3}));

        let many = hook
            .import(
                "loop",
                fields(json!({"action": {"retries": [{"codes": ["a"]}, {"codes": ["b"]}]}})),
            )
            .unwrap();
        assert_eq!(many["action"]["retries"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_passthrough() {
        let raw = fields(json!({"catch": [{"error": "*"}]}));
        assert_eq!(Passthrough.import("x", raw.clone()).unwrap(), raw);
    }
}
