//! Schema-guided JSON for wire messages.
//!
//! The HTTP transport carries wire messages as JSON objects. Writing needs no
//! schema; reading does, because JSON alone cannot tell a timestamp from a
//! string or a map from a nested message.
//!
//! | Wire value | JSON |
//! |---|---|
//! | timestamp | RFC 3339 string, UTC, up to nanoseconds |
//! | message | object |
//! | repeated message | array of objects |
//! | map | object of scalars |

use crate::error::{MarshalError, MarshalResult};
use crate::registry::{FieldKind, PlainType, SchemaRegistry};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use vellum_core::{Scalar, Timestamp, WireMessage, WireValue};

/// Renders a message as a JSON object of its set fields.
#[must_use]
pub fn to_json(message: &WireMessage) -> Json {
    let mut out = Map::new();
    for (name, value) in message.fields() {
        out.insert(name.clone(), value_to_json(value));
    }
    Json::Object(out)
}

fn value_to_json(value: &WireValue) -> Json {
    match value {
        WireValue::String(s) => Json::String(s.clone()),
        WireValue::Int(i) => Json::from(*i),
        WireValue::Double(f) => Json::from(*f),
        WireValue::Bool(b) => Json::Bool(*b),
        WireValue::Timestamp(ts) => ts.to_datetime().map_or(Json::Null, |at| {
            Json::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }),
        WireValue::Message(nested) => to_json(nested),
        WireValue::Repeated(items) => Json::Array(items.iter().map(to_json).collect()),
        WireValue::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), scalar_to_json(v)))
                .collect(),
        ),
    }
}

fn scalar_to_json(scalar: &Scalar) -> Json {
    match scalar {
        Scalar::Bool(b) => Json::Bool(*b),
        Scalar::Int(i) => Json::from(*i),
        Scalar::Double(f) => Json::from(*f),
        Scalar::String(s) => Json::String(s.clone()),
    }
}

/// Reads a JSON object as a message of type `message`.
///
/// Unknown keys are dropped and `null` reads as "not set". Values whose JSON
/// shape does not fit the declared kind fail with
/// [`MarshalError::KindMismatch`].
///
/// # Example
///
/// ```
/// use vellum_schema::{catalog, json};
///
/// let registry = catalog::standard();
/// let edit = json::from_json(
///     &registry,
///     catalog::LINE_EDIT,
///     &serde_json::json!({"uuid": "l-1", "text": "TOTAL"}),
/// )
/// .unwrap();
/// assert_eq!(edit.get_str("text"), Some("TOTAL"));
/// ```
pub fn from_json(
    registry: &SchemaRegistry,
    message: &str,
    json: &Json,
) -> MarshalResult<WireMessage> {
    read_message(registry, message, json, "")
}

fn read_message(
    registry: &SchemaRegistry,
    message: &str,
    json: &Json,
    prefix: &str,
) -> MarshalResult<WireMessage> {
    let schema = registry.require(message)?;
    let Json::Object(object) = json else {
        if prefix.is_empty() {
            return Err(MarshalError::NotAnObject {
                message: message.to_string(),
            });
        }
        return Err(MarshalError::mismatch(prefix, format!("{message} object"), json_kind(json)));
    };
    let mut out = WireMessage::new(message);
    for (name, value) in object {
        let Some(kind) = schema.field(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        out.set(name.clone(), read_value(registry, kind, value, &path)?);
    }
    Ok(out)
}

fn read_value(
    registry: &SchemaRegistry,
    kind: &FieldKind,
    json: &Json,
    path: &str,
) -> MarshalResult<WireValue> {
    let mismatch = || MarshalError::mismatch(path, kind.describe(), json_kind(json));
    let value = match (kind, json) {
        (FieldKind::NestedList { message }, Json::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(read_message(registry, message, item, &format!("{path}[{i}]"))?);
            }
            WireValue::Repeated(out)
        }
        (FieldKind::NestedObject { message }, Json::Object(_)) => {
            WireValue::Message(read_message(registry, message, json, path)?)
        }
        (FieldKind::Identifier | FieldKind::Plain(PlainType::String), Json::String(s)) => {
            WireValue::String(s.clone())
        }
        (FieldKind::Timestamp, Json::String(s)) => {
            let at = DateTime::parse_from_rfc3339(s).map_err(|_| mismatch())?;
            WireValue::Timestamp(Timestamp::from_datetime(at.with_timezone(&Utc)))
        }
        (FieldKind::DynamicMap, Json::Object(entries)) => {
            let mut map = BTreeMap::new();
            for (key, entry) in entries {
                let scalar = match entry {
                    Json::Null => continue,
                    Json::Bool(b) => Scalar::Bool(*b),
                    Json::Number(n) => match n.as_i64() {
                        Some(i) => Scalar::Int(i),
                        None => Scalar::Double(n.as_f64().ok_or_else(mismatch)?),
                    },
                    Json::String(s) => Scalar::String(s.clone()),
                    other => {
                        return Err(MarshalError::mismatch(
                            &format!("{path}.{key}"),
                            "scalar map entry",
                            json_kind(other),
                        ))
                    }
                };
                map.insert(key.clone(), scalar);
            }
            WireValue::Map(map)
        }
        (FieldKind::Plain(PlainType::Int), Json::Number(n)) => {
            WireValue::Int(n.as_i64().ok_or_else(mismatch)?)
        }
        (FieldKind::Plain(PlainType::Double), Json::Number(n)) => {
            WireValue::Double(n.as_f64().ok_or_else(mismatch)?)
        }
        (FieldKind::Plain(PlainType::Bool), Json::Bool(b)) => WireValue::Bool(*b),
        _ => return Err(mismatch()),
    };
    Ok(value)
}

const fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use serde_json::json;
    use vellum_core::MapState;

    #[test]
    fn test_timestamp_json_roundtrip() {
        let registry = catalog::standard();
        let input = json!({"created_at": "2024-01-12T10:00:00.250Z", "filename": "a.pdf"});
        let wire = from_json(&registry, catalog::DOCUMENT_INFO, &input).unwrap();
        assert!(matches!(wire.get("created_at"), Some(WireValue::Timestamp(ts)) if ts.nanos == 250_000_000));
        assert_eq!(to_json(&wire), input);
    }

    #[test]
    fn test_map_presence_survives_json() {
        let registry = catalog::standard();
        let wire = from_json(&registry, catalog::DOCUMENT_INFO, &json!({"verified": {}})).unwrap();
        assert_eq!(wire.map_state("verified"), MapState::Empty);
        assert_eq!(to_json(&wire), json!({"verified": {}}));

        let wire = from_json(&registry, catalog::DOCUMENT_INFO, &json!({"verified": null})).unwrap();
        assert_eq!(wire.map_state("verified"), MapState::Unset);
    }

    #[test]
    fn test_nested_messages_are_typed() {
        let registry = catalog::standard();
        let input = json!({"bbox": {"top_left": {"x": 1, "y": 2.5}}});
        let wire = from_json(&registry, catalog::LINE, &input).unwrap();
        let Some(WireValue::Message(bbox)) = wire.get("bbox") else {
            panic!("bbox should be a message");
        };
        assert_eq!(bbox.type_name(), catalog::BOUNDING_BOX);
        let Some(WireValue::Message(corner)) = bbox.get("top_left") else {
            panic!("top_left should be a message");
        };
        assert_eq!(corner.get("x"), Some(&WireValue::Double(1.0)));
    }

    #[test]
    fn test_shape_mismatch_is_reported_with_path() {
        let registry = catalog::standard();
        let input = json!({"lines": [{"uuid": "l-1"}, "oops"]});
        let err = from_json(&registry, catalog::PARAGRAPH, &input).unwrap_err();
        assert_eq!(err.path(), Some("lines[1]"));
    }

    #[test]
    fn test_non_object_root() {
        let registry = catalog::standard();
        let err = from_json(&registry, catalog::LINE, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, MarshalError::NotAnObject { .. }));
    }

    #[test]
    fn test_bad_timestamp_is_mismatch() {
        let registry = catalog::standard();
        let err = from_json(&registry, catalog::DOCUMENT, &json!({"created_at": "yesterday"})).unwrap_err();
        assert!(matches!(err, MarshalError::KindMismatch { .. }));
    }
}
