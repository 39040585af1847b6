//! Object schema builder.
//!
//! [`ObjectSchema`] collects field definitions and unknown-key handling,
//! then freezes into a [`Schema`] with an [`Shape::Object`] node.

use indexmap::IndexMap;
use serde_json::Value;

use crate::schema::shape::{Field, ObjectShape, Presence, Shape, UnknownKeys};
use crate::schema::Schema;
use crate::validator::{IntoValidator, Validator};

/// Builder for object schemas.
///
/// Fields are validated in declaration order; issues from every field are
/// accumulated. Unknown keys are passed through by default.
///
/// # Example
///
/// ```rust
/// use schematch::{Schema, Validator};
/// use serde_json::json;
///
/// let strict = Schema::object()
///     .field("id", Schema::integer())
///     .additional_properties(false)
///     .build();
///
/// let out = strict.validate(&json!({"id": 1, "extra": true})).into_ready().unwrap();
/// assert!(out.is_failure());
/// ```
pub struct ObjectSchema {
    fields: IndexMap<String, Field>,
    unknown: UnknownKeys,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            unknown: UnknownKeys::Allow,
        }
    }

    fn insert(mut self, name: impl Into<String>, schema: Schema, presence: Presence) -> Self {
        self.fields.insert(name.into(), Field { schema, presence });
        self
    }

    /// Adds a required field.
    pub fn field(self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.insert(name, schema.into(), Presence::Required)
    }

    /// Adds a field that may be absent.
    pub fn optional(self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.insert(name, schema.into(), Presence::Optional)
    }

    /// Adds a field filled with `default` when absent.
    pub fn default(self, name: impl Into<String>, schema: impl Into<Schema>, default: Value) -> Self {
        self.insert(name, schema.into(), Presence::Default(default))
    }

    /// Configures unknown keys: `true` allows, `false` rejects, a schema
    /// validates each unknown value.
    pub fn additional_properties(mut self, setting: impl Into<AdditionalProperties>) -> Self {
        self.unknown = setting.into().0;
        self
    }

    pub fn build(self) -> Schema {
        Schema::from_shape(Shape::Object(ObjectShape {
            fields: self.fields,
            unknown: self.unknown,
        }))
    }
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectSchema> for Schema {
    fn from(builder: ObjectSchema) -> Self {
        builder.build()
    }
}

impl IntoValidator for ObjectSchema {
    fn into_validator(self) -> std::sync::Arc<dyn Validator> {
        self.build().into_validator()
    }
}

/// Setting accepted by [`ObjectSchema::additional_properties`].
pub struct AdditionalProperties(UnknownKeys);

impl From<bool> for AdditionalProperties {
    fn from(allow: bool) -> Self {
        if allow {
            AdditionalProperties(UnknownKeys::Allow)
        } else {
            AdditionalProperties(UnknownKeys::Deny)
        }
    }
}

impl From<Schema> for AdditionalProperties {
    fn from(schema: Schema) -> Self {
        AdditionalProperties(UnknownKeys::Validate(schema))
    }
}
