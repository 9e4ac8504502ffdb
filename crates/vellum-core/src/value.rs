//! Store-side record model.
//!
//! A [`Record`] is what the document store hands out: a mapping from field
//! name to [`Value`], where values nest arbitrarily. Records are loosely
//! typed; the schema registry decides how each field crosses the wire.

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when parsing an [`ObjectId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object id '{input}': expected 24 hexadecimal characters")]
pub struct ObjectIdError {
    input: String,
}

/// The store-native 12-byte identifier.
///
/// Its canonical text form is 24 lowercase hexadecimal characters.
///
/// # Example
///
/// ```
/// use vellum_core::ObjectId;
///
/// let id: ObjectId = "65a1f0c2e4b0a1b2c3d4e5f6".parse().unwrap();
/// assert_eq!(id.to_hex(), "65a1f0c2e4b0a1b2c3d4e5f6");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

static OBJECT_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

impl ObjectId {
    /// Generates a new identifier: 4 bytes of epoch seconds, 5 random bytes
    /// and a 3 byte counter.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let secs = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        let random = Uuid::now_v7();
        bytes[4..9].copy_from_slice(&random.as_bytes()[11..16]);
        let counter = OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Creates an identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Returns the canonical 24 character hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.0.iter().fold(String::with_capacity(24), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }

    /// Parses the 24 character hex form (either case).
    pub fn parse_str(input: &str) -> Result<Self, ObjectIdError> {
        let err = || ObjectIdError {
            input: input.to_string(),
        };
        if input.len() != 24 || !input.is_ascii() {
            return Err(err());
        }
        let mut bytes = [0u8; 12];
        for (i, chunk) in input.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| err())?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }

    /// Returns `true` if `input` is a well-formed hex identifier.
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        input.len() == 24 && input.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// A loosely typed store value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null. Treated as "absent" when crossing the wire.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Store-native identifier.
    ObjectId(ObjectId),
    /// Instant with millisecond precision, UTC.
    DateTime(DateTime<Utc>),
    /// Nested record.
    Document(Record),
    /// List of values.
    Array(Vec<Value>),
}

impl Value {
    /// Creates a date-time value truncated to store precision (milliseconds).
    #[must_use]
    pub fn datetime(at: DateTime<Utc>) -> Self {
        Self::DateTime(at.trunc_subsecs(3))
    }

    /// Name of the value's shape, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::ObjectId(_) => "object id",
            Self::DateTime(_) => "datetime",
            Self::Document(_) => "document",
            Self::Array(_) => "array",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested record, if this is a document.
    #[must_use]
    pub const fn as_document(&self) -> Option<&Record> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Converts from store extended JSON.
    ///
    /// `{"$oid": "<hex>"}` becomes an [`ObjectId`] and `{"$date": "<rfc3339>"}`
    /// (or epoch milliseconds) becomes a [`Value::DateTime`]. Everything else
    /// maps structurally.
    #[must_use]
    pub fn from_extended_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Double))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_extended_json).collect())
            }
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(oid) = map.get("$oid").and_then(|v| v.as_str()) {
                        if let Ok(id) = ObjectId::parse_str(oid) {
                            return Self::ObjectId(id);
                        }
                    }
                    if let Some(date) = map.get("$date") {
                        if let Some(at) = parse_extended_date(date) {
                            return Self::datetime(at);
                        }
                    }
                }
                Self::Document(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Self::from_extended_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Converts to store extended JSON, the inverse of
    /// [`Value::from_extended_json`].
    #[must_use]
    pub fn to_extended_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Double(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::ObjectId(id) => serde_json::json!({ "$oid": id.to_hex() }),
            Self::DateTime(at) => serde_json::json!({
                "$date": at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            }),
            Self::Document(doc) => doc.to_extended_json(),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_extended_json).collect())
            }
        }
    }
}

fn parse_extended_date(date: &serde_json::Value) -> Option<DateTime<Utc>> {
    match date {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::ObjectId(id)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(at: DateTime<Utc>) -> Self {
        Self::datetime(at)
    }
}

impl From<Record> for Value {
    fn from(doc: Record) -> Self {
        Self::Document(doc)
    }
}

impl From<Vec<Record>> for Value {
    fn from(docs: Vec<Record>) -> Self {
        Self::Array(docs.into_iter().map(Self::Document).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

/// A nested store record.
///
/// # Example
///
/// ```
/// use vellum_core::{Record, Value};
///
/// let line = Record::new().with("uuid", "l-1").with("text", "TOTAL 42.00");
/// let doc = Record::new().with("filename", "a.pdf").with("lines", vec![line]);
/// assert_eq!(doc.get("filename"), Some(&Value::from("a.pdf")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Inserts a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Returns a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a mutable field.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    /// Removes a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Returns `true` if the field is present (even when null).
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Collects every value reachable through a dotted path.
    ///
    /// Arrays are traversed element-wise, so `matches.score` yields the score
    /// of every match. A path ending on an array yields the array itself.
    #[must_use]
    pub fn lookup_path<'a>(&'a self, path: &str) -> Vec<&'a Value> {
        let mut current: Vec<&Value> = Vec::new();
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return current;
        };
        if let Some(v) = self.0.get(first) {
            current.push(v);
        }
        for segment in segments {
            let mut next = Vec::new();
            for value in current {
                collect_segment(value, segment, &mut next);
            }
            current = next;
        }
        current
    }

    /// Converts to store extended JSON.
    #[must_use]
    pub fn to_extended_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_extended_json()))
                .collect(),
        )
    }

    /// Converts from store extended JSON. Non-object input yields `None`.
    #[must_use]
    pub fn from_extended_json(json: &serde_json::Value) -> Option<Self> {
        match Value::from_extended_json(json) {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

fn collect_segment<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Document(doc) => {
            if let Some(v) = doc.get(segment) {
                out.push(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_segment(item, segment, out);
            }
        }
        _ => {}
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_object_id_parse_and_display() {
        let id = ObjectId::parse_str("65A1F0C2E4B0A1B2C3D4E5F6").unwrap();
        assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn test_object_id_rejects_bad_input() {
        assert!(ObjectId::parse_str("not-an-id").is_err());
        assert!(ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5fz").is_err());
        assert!(!ObjectId::is_valid("65a1f0c2"));
    }

    #[test]
    fn test_object_id_new_is_unique() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn test_datetime_truncates_to_millis() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let Value::DateTime(stored) = Value::datetime(at) else {
            panic!("expected datetime");
        };
        assert_eq!(stored.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_lookup_path_traverses_arrays() {
        let doc = Record::new().with(
            "matches",
            vec![
                Record::new().with("score", 1),
                Record::new().with("score", 2),
                Record::new(),
            ],
        );
        let scores = doc.lookup_path("matches.score");
        assert_eq!(scores, vec![&Value::Int(1), &Value::Int(2)]);
        assert!(doc.lookup_path("missing.score").is_empty());
    }

    #[test]
    fn test_extended_json_conversion() {
        let json = serde_json::json!({
            "_id": {"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"},
            "created_at": {"$date": "2024-01-12T10:00:00.250Z"},
            "pages": [{"number": 1}],
            "score": 0.5,
        });
        let record = Record::from_extended_json(&json).unwrap();
        assert!(matches!(record.get("_id"), Some(Value::ObjectId(_))));
        assert!(matches!(record.get("created_at"), Some(Value::DateTime(_))));
        assert_eq!(record.get("score"), Some(&Value::Double(0.5)));
        assert_eq!(record.to_extended_json(), json);
    }

    proptest! {
        #[test]
        fn prop_object_id_hex_roundtrip(bytes in proptest::array::uniform12(any::<u8>())) {
            let id = ObjectId::from_bytes(bytes);
            prop_assert_eq!(ObjectId::parse_str(&id.to_hex()).unwrap(), id);
        }
    }
}
