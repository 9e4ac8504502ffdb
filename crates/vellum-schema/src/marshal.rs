//! The generic record marshaler.

use crate::error::{MarshalError, MarshalResult};
use crate::registry::{FieldKind, MessageSchema, PlainType, SchemaRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;
use vellum_core::{ObjectId, Record, Scalar, Timestamp, Value, WireMessage, WireValue};

/// Converts records to wire messages and back, guided by a [`SchemaRegistry`].
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct Marshaler {
    registry: Arc<SchemaRegistry>,
}

impl Marshaler {
    /// Creates a marshaler over a registry.
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Encodes a record as a message of type `message`.
    ///
    /// Fields the schema does not declare are dropped, null fields are
    /// omitted, and a record with no matching fields yields an empty message.
    pub fn encode(&self, record: &Record, message: &str) -> MarshalResult<WireMessage> {
        let schema = self.registry.require(message)?;
        self.encode_with(record, schema, "", None)
    }

    /// Encodes only the listed top-level fields.
    ///
    /// An empty field list means "no projection" and encodes everything.
    pub fn encode_projected<S: AsRef<str>>(
        &self,
        record: &Record,
        message: &str,
        fields: &[S],
    ) -> MarshalResult<WireMessage> {
        let schema = self.registry.require(message)?;
        if fields.is_empty() {
            return self.encode_with(record, schema, "", None);
        }
        let keep: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
        self.encode_with(record, schema, "", Some(&keep))
    }

    /// Decodes a message back into a record.
    ///
    /// Only fields explicitly set on the message are emitted.
    pub fn decode(&self, wire: &WireMessage) -> MarshalResult<Record> {
        let schema = self.registry.require(wire.type_name())?;
        self.decode_with(wire, schema, "")
    }

    fn encode_with(
        &self,
        record: &Record,
        schema: &MessageSchema,
        prefix: &str,
        only: Option<&[&str]>,
    ) -> MarshalResult<WireMessage> {
        let mut out = WireMessage::new(schema.name());
        for (name, value) in record {
            if only.is_some_and(|keep| !keep.contains(&name.as_str())) {
                continue;
            }
            let Some(kind) = schema.field(name) else {
                trace!(
                    message = schema.name(),
                    field = %join(prefix, name),
                    "dropping undeclared field"
                );
                continue;
            };
            let path = join(prefix, name);
            if let Some(wire) = self.encode_value(value, kind, &path)? {
                out.set(name.clone(), wire);
            }
        }
        Ok(out)
    }

    fn encode_value(
        &self,
        value: &Value,
        kind: &FieldKind,
        path: &str,
    ) -> MarshalResult<Option<WireValue>> {
        if value.is_null() {
            return Ok(None);
        }
        let wire = match kind {
            FieldKind::NestedList { message } => {
                let Value::Array(items) = value else {
                    return Err(MarshalError::mismatch(path, kind.describe(), value.kind_name()));
                };
                let schema = self.registry.require(message)?;
                let mut encoded = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    let Value::Document(doc) = item else {
                        return Err(MarshalError::mismatch(
                            &item_path,
                            format!("{message} object"),
                            item.kind_name(),
                        ));
                    };
                    encoded.push(self.encode_with(doc, schema, &item_path, None)?);
                }
                WireValue::Repeated(encoded)
            }
            FieldKind::NestedObject { message } => {
                let Value::Document(doc) = value else {
                    return Err(MarshalError::mismatch(path, kind.describe(), value.kind_name()));
                };
                let schema = self.registry.require(message)?;
                WireValue::Message(self.encode_with(doc, schema, path, None)?)
            }
            FieldKind::Identifier => match value {
                Value::ObjectId(id) => WireValue::String(id.to_hex()),
                // A hex string would come back as an ObjectId.
                Value::String(s) if ObjectId::parse_str(s).is_ok() => {
                    return Err(MarshalError::mismatch(path, "identifier", "object id as string"))
                }
                Value::String(s) => WireValue::String(s.clone()),
                other => {
                    return Err(MarshalError::mismatch(path, "identifier", other.kind_name()))
                }
            },
            FieldKind::Timestamp => match value {
                Value::DateTime(at) => WireValue::Timestamp(Timestamp::from_datetime(*at)),
                other => return Err(MarshalError::mismatch(path, "timestamp", other.kind_name())),
            },
            FieldKind::DynamicMap => match value {
                Value::Bool(false) => return Ok(None),
                Value::Document(doc) => WireValue::Map(encode_map(doc, path)?),
                other => return Err(MarshalError::mismatch(path, "map", other.kind_name())),
            },
            FieldKind::Plain(ty) => encode_plain(value, *ty, path)?,
        };
        Ok(Some(wire))
    }

    fn decode_with(
        &self,
        wire: &WireMessage,
        schema: &MessageSchema,
        prefix: &str,
    ) -> MarshalResult<Record> {
        let mut out = Record::new();
        for (name, value) in wire.fields() {
            let Some(kind) = schema.field(name) else {
                continue;
            };
            let path = join(prefix, name);
            out.insert(name.clone(), self.decode_value(value, kind, &path)?);
        }
        Ok(out)
    }

    fn decode_value(&self, value: &WireValue, kind: &FieldKind, path: &str) -> MarshalResult<Value> {
        let mismatch = || MarshalError::mismatch(path, kind.describe(), value.kind_name());
        let decoded = match (kind, value) {
            (FieldKind::NestedList { message }, WireValue::Repeated(items)) => {
                let schema = self.registry.require(message)?;
                let mut docs = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    check_type(item, message, &item_path)?;
                    docs.push(Value::Document(self.decode_with(item, schema, &item_path)?));
                }
                Value::Array(docs)
            }
            (FieldKind::NestedObject { message }, WireValue::Message(nested)) => {
                check_type(nested, message, path)?;
                let schema = self.registry.require(message)?;
                Value::Document(self.decode_with(nested, schema, path)?)
            }
            (FieldKind::Identifier, WireValue::String(s)) => match ObjectId::parse_str(s) {
                Ok(id) => Value::ObjectId(id),
                Err(_) => Value::String(s.clone()),
            },
            (FieldKind::Timestamp, WireValue::Timestamp(ts)) => {
                let at = ts.to_datetime().ok_or_else(|| MarshalError::InvalidTimestamp {
                    path: path.to_string(),
                })?;
                Value::DateTime(at)
            }
            (FieldKind::DynamicMap, WireValue::Map(entries)) => Value::Document(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), scalar_to_value(v)))
                    .collect(),
            ),
            (FieldKind::Plain(PlainType::String), WireValue::String(s)) => Value::String(s.clone()),
            (FieldKind::Plain(PlainType::Int), WireValue::Int(i)) => Value::Int(*i),
            (FieldKind::Plain(PlainType::Double), WireValue::Double(f)) => Value::Double(*f),
            (FieldKind::Plain(PlainType::Bool), WireValue::Bool(b)) => Value::Bool(*b),
            _ => return Err(mismatch()),
        };
        Ok(decoded)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn check_type(wire: &WireMessage, expected: &str, path: &str) -> MarshalResult<()> {
    if wire.type_name() == expected {
        Ok(())
    } else {
        Err(MarshalError::WrongMessageType {
            path: path.to_string(),
            expected: expected.to_string(),
            found: wire.type_name().to_string(),
        })
    }
}

fn encode_plain(value: &Value, ty: PlainType, path: &str) -> MarshalResult<WireValue> {
    match (ty, value) {
        (PlainType::String, Value::String(s)) => Ok(WireValue::String(s.clone())),
        (PlainType::Int, Value::Int(i)) => Ok(WireValue::Int(*i)),
        (PlainType::Double, Value::Double(f)) => Ok(WireValue::Double(*f)),
        (PlainType::Bool, Value::Bool(b)) => Ok(WireValue::Bool(*b)),
        (ty, other) => Err(MarshalError::mismatch(path, ty.name(), other.kind_name())),
    }
}

fn encode_map(doc: &Record, path: &str) -> MarshalResult<BTreeMap<String, Scalar>> {
    let mut entries = BTreeMap::new();
    for (key, value) in doc {
        let scalar = match value {
            Value::Null => continue,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Int(i) => Scalar::Int(*i),
            Value::Double(f) => Scalar::Double(*f),
            Value::String(s) => Scalar::String(s.clone()),
            other => {
                return Err(MarshalError::mismatch(
                    &join(path, key),
                    "scalar map entry",
                    other.kind_name(),
                ))
            }
        };
        entries.insert(key.clone(), scalar);
    }
    Ok(entries)
}

fn scalar_to_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::Int(*i),
        Scalar::Double(f) => Value::Double(*f),
        Scalar::String(s) => Value::String(s.clone()),
    }
}
