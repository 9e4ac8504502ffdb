//! Schema registry types.

use crate::error::{MarshalError, MarshalResult};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Wire type of a plain scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlainType {
    /// UTF-8 string.
    String,
    /// 64-bit integer.
    Int,
    /// 64-bit float. Store integers are accepted and widened.
    Double,
    /// Boolean.
    Bool,
}

impl PlainType {
    /// Name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
        }
    }
}

/// How a field crosses the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Ordered list of nested records of one message type.
    NestedList {
        /// Element message type.
        message: String,
    },
    /// A single nested record.
    NestedObject {
        /// Nested message type.
        message: String,
    },
    /// Store-native identifier carried as its canonical string.
    Identifier,
    /// UTC instant.
    Timestamp,
    /// String-keyed scalar map whose keys are not described by the schema.
    DynamicMap,
    /// Scalar copied as is.
    Plain(PlainType),
}

impl FieldKind {
    /// Name used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::NestedList { message } => format!("list of {message}"),
            Self::NestedObject { message } => format!("{message} object"),
            Self::Identifier => "identifier".to_string(),
            Self::Timestamp => "timestamp".to_string(),
            Self::DynamicMap => "map".to_string(),
            Self::Plain(t) => t.name().to_string(),
        }
    }

    fn nested_message(&self) -> Option<&str> {
        match self {
            Self::NestedList { message } | Self::NestedObject { message } => Some(message),
            _ => None,
        }
    }
}

/// A (field name, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, identical on both sides of the boundary.
    pub name: String,
    /// Conversion behavior.
    pub kind: FieldKind,
}

/// The field table of one message type.
#[derive(Debug, Clone)]
pub struct MessageSchema {
    name: String,
    fields: IndexMap<String, FieldKind>,
}

impl MessageSchema {
    /// Starts a schema for the named message type.
    ///
    /// # Example
    ///
    /// ```
    /// use vellum_schema::{FieldKind, MessageSchema, PlainType};
    ///
    /// let point = MessageSchema::builder("Point")
    ///     .plain("x", PlainType::Double)
    ///     .plain("y", PlainType::Double)
    ///     .build();
    /// assert_eq!(point.field("x"), Some(&FieldKind::Plain(PlainType::Double)));
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MessageSchemaBuilder {
        MessageSchemaBuilder {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Returns the message type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field's kind.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    /// Iterates the declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = FieldSpec> + '_ {
        self.fields.iter().map(|(name, kind)| FieldSpec {
            name: name.clone(),
            kind: kind.clone(),
        })
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`MessageSchema`].
#[derive(Debug)]
pub struct MessageSchemaBuilder {
    name: String,
    fields: IndexMap<String, FieldKind>,
}

impl MessageSchemaBuilder {
    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Declares a list of nested `message` records.
    #[must_use]
    pub fn list(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.field(
            name,
            FieldKind::NestedList {
                message: message.into(),
            },
        )
    }

    /// Declares a single nested `message` record.
    #[must_use]
    pub fn object(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.field(
            name,
            FieldKind::NestedObject {
                message: message.into(),
            },
        )
    }

    /// Declares an identifier field.
    #[must_use]
    pub fn identifier(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Identifier)
    }

    /// Declares a timestamp field.
    #[must_use]
    pub fn timestamp(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Timestamp)
    }

    /// Declares a dynamic map field.
    #[must_use]
    pub fn map(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::DynamicMap)
    }

    /// Declares a plain scalar field.
    #[must_use]
    pub fn plain(self, name: impl Into<String>, ty: PlainType) -> Self {
        self.field(name, FieldKind::Plain(ty))
    }

    /// Shorthand for a plain string field.
    #[must_use]
    pub fn string(self, name: impl Into<String>) -> Self {
        self.plain(name, PlainType::String)
    }

    /// Finishes the schema.
    #[must_use]
    pub fn build(self) -> MessageSchema {
        MessageSchema {
            name: self.name,
            fields: self.fields,
        }
    }
}

/// Process-wide table of message schemas.
///
/// Built once at startup, validated, then shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    messages: HashMap<String, MessageSchema>,
}

impl SchemaRegistry {
    /// Starts a registry.
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Looks up a message schema.
    #[must_use]
    pub fn get(&self, message: &str) -> Option<&MessageSchema> {
        self.messages.get(message)
    }

    /// Looks up a message schema, failing on unknown types.
    pub fn require(&self, message: &str) -> MarshalResult<&MessageSchema> {
        self.get(message)
            .ok_or_else(|| MarshalError::UnknownMessage(message.to_string()))
    }

    /// Returns `true` if the type is registered.
    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.messages.contains_key(message)
    }

    /// Number of registered message types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Builder for [`SchemaRegistry`].
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    messages: HashMap<String, MessageSchema>,
}

impl SchemaRegistryBuilder {
    /// Registers a message schema, replacing any previous one of that name.
    #[must_use]
    pub fn message(mut self, schema: MessageSchema) -> Self {
        self.messages.insert(schema.name.clone(), schema);
        self
    }

    /// Finishes the registry, checking that every nested reference resolves.
    pub fn build(self) -> MarshalResult<SchemaRegistry> {
        for schema in self.messages.values() {
            for (field, kind) in &schema.fields {
                if let Some(target) = kind.nested_message() {
                    if !self.messages.contains_key(target) {
                        return Err(MarshalError::DanglingReference {
                            message: schema.name.clone(),
                            field: field.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }
        Ok(SchemaRegistry {
            messages: self.messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let schema = MessageSchema::builder("Line")
            .string("uuid")
            .string("text")
            .list("words", "Word")
            .build();
        let names: Vec<_> = schema.fields().map(|f| f.name).collect();
        assert_eq!(names, vec!["uuid", "text", "words"]);
    }

    #[test]
    fn test_registry_rejects_dangling_reference() {
        let result = SchemaRegistry::builder()
            .message(MessageSchema::builder("Line").list("words", "Word").build())
            .build();
        assert!(matches!(
            result,
            Err(MarshalError::DanglingReference { ref target, .. }) if target == "Word"
        ));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SchemaRegistry::builder()
            .message(MessageSchema::builder("Word").string("text").build())
            .build()
            .unwrap();
        assert!(registry.contains("Word"));
        assert!(registry.require("Ghost").is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_field_kind_describe() {
        let kind = FieldKind::NestedList {
            message: "Page".into(),
        };
        assert_eq!(kind.describe(), "list of Page");
        assert_eq!(FieldKind::Plain(PlainType::Int).describe(), "int");
    }
}
