//! Output port to transition field mapping.
//!
//! A [`ConnectionStrategy`] decides, per node type, which document field
//! the edge leaving each output port is written into. The same table is
//! read in both directions: the importer turns fields into edges, the
//! compiler turns edges back into fields.

use std::fmt;

use serde_json::{Map, Value};

use crate::graph::Port;

const TRANSITION: &str = "transition";
const DEFAULT_TRANSITION: &str = "defaultTransition";
const START_STATE: &str = "state";
const CONDITIONS: &str = "conditions";
const EVENTS: &str = "events";
const CATCH: &str = "catch";

/// The document field an output port fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionSlot {
    /// The plain `transition` field.
    Transition,
    /// The `defaultTransition` field of a conditional.
    DefaultTransition,
    /// The `transition` of the `index`-th entry of the `list` field.
    Branch {
        /// Name of the list field.
        list: &'static str,
        /// 0-based entry index.
        index: usize,
    },
    /// The error output; leads to an error-catch node, never to a field.
    Error,
    /// The entry state of the start block.
    StartState,
}

impl TransitionSlot {
    /// Reads the transition target stored in this slot.
    pub fn read<'a>(&self, fields: &'a Map<String, Value>) -> Option<&'a str> {
        match *self {
            Self::Transition => fields.get(TRANSITION)?.as_str(),
            Self::DefaultTransition => fields.get(DEFAULT_TRANSITION)?.as_str(),
            Self::StartState => fields.get(START_STATE)?.as_str(),
            Self::Branch { list, index } => fields
                .get(list)?
                .as_array()?
                .get(index)?
                .get(TRANSITION)?
                .as_str(),
            Self::Error => None,
        }
    }

    /// Writes `target` into this slot.
    ///
    /// Returns `false` if `fields` has no place for the slot, i.e. the
    /// branch entry does not exist or this is the error slot.
    pub fn write(&self, fields: &mut Map<String, Value>, target: &str) -> bool {
        let key = match *self {
            Self::Transition => TRANSITION,
            Self::DefaultTransition => DEFAULT_TRANSITION,
            Self::StartState => START_STATE,
            Self::Branch { list, index } => {
                return match branch_mut(fields, list, index) {
                    Some(entry) => {
                        entry.insert(TRANSITION.to_owned(), Value::from(target));
                        true
                    }
                    None => false,
                };
            }
            Self::Error => return false,
        };
        fields.insert(key.to_owned(), Value::from(target));
        true
    }

    /// Removes whatever this slot currently holds.
    pub fn clear(&self, fields: &mut Map<String, Value>) {
        match *self {
            Self::Transition => {
                fields.shift_remove(TRANSITION);
            }
            Self::DefaultTransition => {
                fields.shift_remove(DEFAULT_TRANSITION);
            }
            Self::StartState => {
                fields.shift_remove(START_STATE);
            }
            Self::Branch { list, index } => {
                if let Some(entry) = branch_mut(fields, list, index) {
                    entry.shift_remove(TRANSITION);
                }
            }
            Self::Error => {}
        }
    }
}

fn branch_mut<'a>(
    fields: &'a mut Map<String, Value>,
    list: &str,
    index: usize,
) -> Option<&'a mut Map<String, Value>> {
    fields
        .get_mut(list)?
        .as_array_mut()?
        .get_mut(index)?
        .as_object_mut()
}

fn list_len(fields: &Map<String, Value>, list: &str) -> u16 {
    let len = fields
        .get(list)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    u16::try_from(len).unwrap_or(u16::MAX)
}

/// Maps a node type's output ports onto document transition fields.
pub trait ConnectionStrategy: fmt::Debug + Send + Sync {
    /// Port whose edge must lead to an error-catch node, if the type has one.
    fn error_port(&self) -> Option<Port>;

    /// Slot filled by the edge leaving `port`.
    ///
    /// Branch slots are returned for any port past the fixed ones; whether
    /// the entry exists is only known once fields are at hand.
    fn slot(&self, port: Port) -> Option<TransitionSlot>;

    /// Number of output ports needed to represent every transition in
    /// `fields`.
    fn ports_for(&self, fields: &Map<String, Value>) -> u16;

    /// Ports and slots that exist for `fields`, in port order.
    fn slots(&self, fields: &Map<String, Value>) -> Vec<(Port, TransitionSlot)> {
        Port::all(self.ports_for(fields))
            .filter_map(|port| Some((port, self.slot(port)?)))
            .collect()
    }

    /// Transition targets present in raw `fields`, in port order.
    fn targets(&self, fields: &Map<String, Value>) -> Vec<(Port, String)> {
        self.slots(fields)
            .into_iter()
            .filter_map(|(port, slot)| Some((port, slot.read(fields)?.to_owned())))
            .collect()
    }

    /// Removes every edge-derived field.
    fn strip(&self, fields: &mut Map<String, Value>) {
        for (_, slot) in self.slots(fields) {
            slot.clear(fields);
        }
    }

    /// Output port count for a node holding `fields`, never below `minimum`.
    fn output_count(&self, fields: &Map<String, Value>, minimum: u16) -> u16 {
        self.ports_for(fields).max(minimum)
    }
}

/// Port 1 fills `transition`, port 2 is the error output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleTransition;

impl ConnectionStrategy for SingleTransition {
    fn error_port(&self) -> Option<Port> {
        Some(Port::new(2))
    }

    fn slot(&self, port: Port) -> Option<TransitionSlot> {
        match port.index() {
            1 => Some(TransitionSlot::Transition),
            2 => Some(TransitionSlot::Error),
            _ => None,
        }
    }

    fn ports_for(&self, _fields: &Map<String, Value>) -> u16 {
        2
    }
}

/// Port 1 fills `defaultTransition`, port 2 is the error output and
/// port `k >= 3` fills `conditions[k - 3].transition`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalBranches;

impl ConnectionStrategy for ConditionalBranches {
    fn error_port(&self) -> Option<Port> {
        Some(Port::new(2))
    }

    fn slot(&self, port: Port) -> Option<TransitionSlot> {
        match port.index() {
            0 => None,
            1 => Some(TransitionSlot::DefaultTransition),
            2 => Some(TransitionSlot::Error),
            k => Some(TransitionSlot::Branch {
                list: CONDITIONS,
                index: usize::from(k - 3),
            }),
        }
    }

    fn ports_for(&self, fields: &Map<String, Value>) -> u16 {
        2u16.saturating_add(list_len(fields, CONDITIONS))
    }
}

/// Port 1 is the error output and port `k >= 2` fills
/// `events[k - 2].transition`.
///
/// Event races have no default branch, so the first output doubles as the
/// error output.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRace;

impl ConnectionStrategy for EventRace {
    fn error_port(&self) -> Option<Port> {
        Some(Port::FIRST)
    }

    fn slot(&self, port: Port) -> Option<TransitionSlot> {
        match port.index() {
            0 => None,
            1 => Some(TransitionSlot::Error),
            k => Some(TransitionSlot::Branch {
                list: EVENTS,
                index: usize::from(k - 2),
            }),
        }
    }

    fn ports_for(&self, fields: &Map<String, Value>) -> u16 {
        1u16.saturating_add(list_len(fields, EVENTS))
    }
}

/// Port `k` fills `catch[k - 1].transition`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchBranches;

impl ConnectionStrategy for CatchBranches {
    fn error_port(&self) -> Option<Port> {
        None
    }

    fn slot(&self, port: Port) -> Option<TransitionSlot> {
        match port.index() {
            0 => None,
            k => Some(TransitionSlot::Branch {
                list: CATCH,
                index: usize::from(k - 1),
            }),
        }
    }

    fn ports_for(&self, fields: &Map<String, Value>) -> u16 {
        list_len(fields, CATCH)
    }
}

/// Port 1 fills `start.state`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartEntry;

impl ConnectionStrategy for StartEntry {
    fn error_port(&self) -> Option<Port> {
        None
    }

    fn slot(&self, port: Port) -> Option<TransitionSlot> {
        (port == Port::FIRST).then_some(TransitionSlot::StartState)
    }

    fn ports_for(&self, _fields: &Map<String, Value>) -> u16 {
        1
    }
}
