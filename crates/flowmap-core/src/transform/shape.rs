//! Shape classification of document-side transform values.
//!
//! A document never tags which encoding a transform uses, so decoding infers
//! it from the value's shape. The predicates below are tried in a fixed
//! order and the first match wins.

use serde_json::{Map, Value};

use super::script;

/// The shape of a document-side transform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    /// Null, empty string or empty mapping.
    Empty,
    /// A string wrapped in the reserved script markers; holds the body.
    Script(&'a str),
    /// Nested structure, sequences and non-string scalars.
    Structure(&'a Value),
    /// A mapping whose values are all scalars.
    Flat(&'a Map<String, Value>),
    /// Any other string.
    Query(&'a str),
}

type Predicate = for<'a> fn(&'a Value) -> Option<Shape<'a>>;

/// Decode precedence, highest first.
const PRECEDENCE: [Predicate; 5] = [empty, wrapped_script, structure, flat_map, query];

/// Classifies a transform value.
pub fn classify(value: &Value) -> Shape<'_> {
    PRECEDENCE
        .iter()
        .find_map(|predicate| predicate(value))
        .unwrap_or(Shape::Structure(value))
}

/// Returns the nesting depth of a value.
///
/// Scalars have depth 0, a container has one more than its deepest child,
/// and an empty container has depth 1.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn empty(value: &Value) -> Option<Shape<'_>> {
    let is_empty = match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    is_empty.then_some(Shape::Empty)
}

fn wrapped_script(value: &Value) -> Option<Shape<'_>> {
    value.as_str().and_then(script::unwrap).map(Shape::Script)
}

fn structure(value: &Value) -> Option<Shape<'_>> {
    let nested = match value {
        Value::String(_) => false,
        Value::Object(_) => depth(value) > 1,
        _ => true,
    };
    nested.then_some(Shape::Structure(value))
}

fn flat_map(value: &Value) -> Option<Shape<'_>> {
    value.as_object().map(Shape::Flat)
}

fn query(value: &Value) -> Option<Shape<'_>> {
    value.as_str().map(Shape::Query)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_depth() {
        assert_eq!(depth(&json!("x")), 0);
        assert_eq!(depth(&json!({})), 1);
        assert_eq!(depth(&json!({"a": 1, "b": "c"})), 1);
        assert_eq!(depth(&json!({"a": {"b": 1}})), 2);
        assert_eq!(depth(&json!({"a": {"b": {"c": [1]}}})), 4);
    }

    #[test]
    fn test_script_wins_over_query() {
        assert_eq!(
            classify(&json!("js(return 1)")),
            Shape::Script("return 1")
        );
        assert_eq!(classify(&json!("jq(.a)")), Shape::Query("jq(.a)"));
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(classify(&json!(null)), Shape::Empty);
        assert_eq!(classify(&json!("")), Shape::Empty);
        assert_eq!(classify(&json!({})), Shape::Empty);
    }

    #[test]
    fn test_depth_splits_flat_and_structure() {
        assert!(matches!(classify(&json!({"a": 1})), Shape::Flat(_)));
        assert!(matches!(
            classify(&json!({"a": {"b": 1}})),
            Shape::Structure(_)
        ));
        assert!(matches!(classify(&json!([1, 2])), Shape::Structure(_)));
        assert!(matches!(classify(&json!(42)), Shape::Structure(_)));
    }
}
