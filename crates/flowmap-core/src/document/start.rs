//! Start descriptor of a workflow document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// How a workflow is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StartKind {
    /// Started explicitly.
    Default,
    /// Started on a cron schedule.
    Scheduled,
    /// Started by a single cloud event.
    Event,
    /// Started by whichever of several events arrives first.
    EventsXor,
    /// Started once all of several events have arrived.
    EventsAnd,
}

impl StartKind {
    /// Fields copied from the start node into the document for this kind.
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Default => &[],
            Self::Scheduled => &["cron"],
            Self::Event => &["event"],
            Self::EventsXor => &["events"],
            Self::EventsAnd => &["events", "lifespan", "correlate"],
        }
    }
}

/// The `start` block of a workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Start {
    /// Start kind; documents may omit it.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StartKind>,
    /// Entry state id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Start {
    /// Creates a start block pointing at `state`.
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            kind: None,
            state: Some(state.into()),
            fields: Map::new(),
        }
    }

    /// Builds a start block from start node form data.
    ///
    /// Only the fields belonging to the form's kind are kept.
    pub fn from_form(form: &Map<String, Value>, state: impl Into<String>) -> Result<Self, String> {
        let kind = match form.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(kind)) => Some(
                kind.parse::<StartKind>()
                    .map_err(|_| format!("unknown start type `{kind}`"))?,
            ),
            Some(other) => return Err(format!("start type must be a string, got {other}")),
        };

        let fields = kind
            .unwrap_or(StartKind::Default)
            .fields()
            .iter()
            .filter_map(|key| form.get(*key).map(|value| ((*key).to_owned(), value.clone())))
            .collect();

        Ok(Self {
            kind,
            state: Some(state.into()),
            fields,
        })
    }

    /// Converts this block into start node form data, dropping `state`.
    pub fn into_form(self) -> Map<String, Value> {
        let mut form = Map::new();
        if let Some(kind) = self.kind {
            form.insert("type".into(), Value::String(kind.to_string()));
        }
        form.extend(self.fields);
        form
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(StartKind::EventsXor.to_string(), "eventsXor");
        assert_eq!("scheduled".parse::<StartKind>().unwrap(), StartKind::Scheduled);
    }

    #[test]
    fn test_from_form_keeps_kind_fields() {
        let form: Map<String, Value> =
            serde_json::from_value(json!({"type": "scheduled", "cron": "* * * * *", "events": []}))
                .unwrap();
        let start = Start::from_form(&form, "a").unwrap();
        assert_eq!(start.kind, Some(StartKind::Scheduled));
        assert_eq!(start.state.as_deref(), Some("a"));
        assert_eq!(start.fields.len(), 1);
        assert!(start.fields.contains_key("cron"));
    }

    #[test]
    fn test_from_form_rejects_unknown_kind() {
        let mut form = Map::new();
        form.insert("type".into(), json!("hourly"));
        assert!(Start::from_form(&form, "a").is_err());
    }

    #[test]
    fn test_into_form_drops_state() {
        let start: Start =
            serde_json::from_value(json!({"type": "event", "state": "a", "event": {"type": "x"}}))
                .unwrap();
        let form = start.into_form();
        assert_eq!(Value::Object(form), json!({"type": "event", "event": {"type": "x"}}));
    }
}
