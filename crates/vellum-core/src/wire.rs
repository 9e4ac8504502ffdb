//! Presence-aware wire messages.
//!
//! A [`WireMessage`] only holds fields that were explicitly set. There is no
//! zero-value inference: a field is either present with a value or absent,
//! and [`WireMessage::has`] answers which. This is what lets "evaluated, no
//! matches" be told apart from "not evaluated yet".

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point in time on the wire: seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since 1970-01-01T00:00:00Z.
    pub seconds: i64,
    /// Non-negative nanosecond offset, `0..1_000_000_000`.
    pub nanos: i32,
}

impl Timestamp {
    /// Converts from a UTC instant.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanos: at.timestamp_subsec_nanos() as i32,
        }
    }

    /// Converts back to a UTC instant. Out-of-range values yield `None`.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        Utc.timestamp_opt(self.seconds, nanos).single()
    }
}

/// A scalar entry of a map-typed wire field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Double(f64),
    /// String.
    String(String),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// A set wire field.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// String field.
    String(String),
    /// Integer field.
    Int(i64),
    /// Float field.
    Double(f64),
    /// Boolean field.
    Bool(bool),
    /// Timestamp field.
    Timestamp(Timestamp),
    /// Singular nested message.
    Message(WireMessage),
    /// Repeated nested message.
    Repeated(Vec<WireMessage>),
    /// String-keyed map of scalars.
    Map(BTreeMap<String, Scalar>),
}

impl WireValue {
    /// Name of the value's shape, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::Timestamp(_) => "timestamp",
            Self::Message(_) => "message",
            Self::Repeated(_) => "repeated message",
            Self::Map(_) => "map",
        }
    }
}

/// State of a map-typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    /// The field was never set: not evaluated.
    Unset,
    /// The field is set to an empty map: evaluated, nothing found.
    Empty,
    /// The field holds at least one entry.
    Populated,
}

/// A typed wire message.
///
/// # Example
///
/// ```
/// use vellum_core::{MapState, WireMessage, WireValue};
/// use std::collections::BTreeMap;
///
/// let mut info = WireMessage::new("DocumentInfo");
/// assert_eq!(info.map_state("verified"), MapState::Unset);
///
/// info.set("verified", WireValue::Map(BTreeMap::new()));
/// assert_eq!(info.map_state("verified"), MapState::Empty);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    type_name: String,
    fields: BTreeMap<String, WireValue>,
}

impl WireMessage {
    /// Creates an empty message of the given type.
    ///
    /// An empty message is also the "nothing found" sentinel for single
    /// result lookups.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns the message type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: WireValue) {
        self.fields.insert(field.into(), value);
    }

    /// Builder-style [`WireMessage::set`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: WireValue) -> Self {
        self.set(field, value);
        self
    }

    /// Clears a field, returning its previous value.
    pub fn clear(&mut self, field: &str) -> Option<WireValue> {
        self.fields.remove(field)
    }

    /// Returns a set field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&WireValue> {
        self.fields.get(field)
    }

    /// Returns `true` if the field was explicitly set.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the state of a map-typed field.
    ///
    /// A field holding something other than a map reads as
    /// [`MapState::Unset`].
    #[must_use]
    pub fn map_state(&self, field: &str) -> MapState {
        match self.fields.get(field) {
            Some(WireValue::Map(map)) if map.is_empty() => MapState::Empty,
            Some(WireValue::Map(_)) => MapState::Populated,
            _ => MapState::Unset,
        }
    }

    /// Returns the string value of a field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(WireValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of a repeated field; absent reads as empty.
    #[must_use]
    pub fn get_repeated(&self, field: &str) -> &[WireMessage] {
        match self.fields.get(field) {
            Some(WireValue::Repeated(items)) => items,
            _ => &[],
        }
    }

    /// Iterates set fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &WireValue)> {
        self.fields.iter()
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of set fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}
