//! The introspectable definition tree behind a native [`Schema`].
//!
//! `Shape` is public so that family adapters and tools can walk a schema's
//! declared structure without running it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::schema::Schema;
use crate::validator::{BoxFuture, Validator};

/// Primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Any,
    Null,
    Boolean,
    /// Any JSON number.
    Number,
    /// A number representable as `i64` or `u64`; floats are rejected.
    Integer,
    String,
}

impl Primitive {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Primitive::Any => true,
            Primitive::Null => value.is_null(),
            Primitive::Boolean => value.is_boolean(),
            Primitive::Number => value.is_number(),
            Primitive::Integer => value.is_i64() || value.is_u64(),
            Primitive::String => value.is_string(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Any => "any",
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Number => "number",
            Primitive::Integer => "integer",
            Primitive::String => "string",
        }
    }
}

/// Whether an object field must be present.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    /// Absent fields are filled in with this value.
    Default(Value),
}

pub struct Field {
    pub schema: Schema,
    pub presence: Presence,
}

/// How keys not declared in an object shape are handled.
pub enum UnknownKeys {
    /// Passed through to the output unchanged.
    Allow,
    Deny,
    /// Each unknown value is validated against this schema.
    Validate(Schema),
}

pub struct ObjectShape {
    pub fields: IndexMap<String, Field>,
    pub unknown: UnknownKeys,
}

impl ObjectShape {
    /// Returns the literal a required field is pinned to, if any.
    pub fn literal_field(&self, key: &str) -> Option<&Value> {
        let field = self.fields.get(key)?;
        if field.presence != Presence::Required {
            return None;
        }
        match field.schema.shape() {
            Shape::Literal(value) if is_scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Required fields pinned to a scalar literal, in declaration order.
    pub fn literal_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .keys()
            .filter_map(|key| self.literal_field(key).map(|value| (key.as_str(), value)))
    }
}

/// A value-dependent check applied after the inner schema accepted a value.
pub enum Rule {
    /// Minimum length of a string (in chars) or array.
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Minimum(f64),
    Maximum(f64),
    Custom(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl Rule {
    pub fn holds(&self, value: &Value) -> bool {
        match self {
            Rule::MinLength(min) => length(value).is_some_and(|len| len >= *min),
            Rule::MaxLength(max) => length(value).is_some_and(|len| len <= *max),
            Rule::Pattern(regex) => value.as_str().is_some_and(|s| regex.is_match(s)),
            Rule::Minimum(min) => value.as_f64().is_some_and(|n| n >= *min),
            Rule::Maximum(max) => value.as_f64().is_some_and(|n| n <= *max),
            Rule::Custom(check) => check(value),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rule::MinLength(_) => "min_length",
            Rule::MaxLength(_) => "max_length",
            Rule::Pattern(_) => "pattern",
            Rule::Minimum(_) => "minimum",
            Rule::Maximum(_) => "maximum",
            Rule::Custom(_) => "custom",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Rule::MinLength(min) => format!("length must be at least {}", min),
            Rule::MaxLength(max) => format!("length must be at most {}", max),
            Rule::Pattern(regex) => format!("must match pattern '{}'", regex.as_str()),
            Rule::Minimum(min) => format!("must be >= {}", min),
            Rule::Maximum(max) => format!("must be <= {}", max),
            Rule::Custom(_) => "failed custom check".to_string(),
        }
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

pub type MapFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type AsyncCheck = Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;

/// A node of the schema definition tree.
pub enum Shape {
    /// Exactly this value.
    Literal(Value),
    Primitive(Primitive),
    Object(ObjectShape),
    /// Fixed positions, optionally followed by any number of `rest` items.
    Tuple {
        items: Vec<Schema>,
        rest: Option<Schema>,
    },
    Array(Schema),
    /// First option that accepts the value wins.
    Union(Vec<Schema>),
    /// Options routed by the literal value of `key`.
    Variant {
        key: String,
        options: Vec<Schema>,
    },
    Refined {
        inner: Schema,
        rule: Rule,
        message: Option<String>,
    },
    Transform {
        inner: Schema,
        map: MapFn,
    },
    /// An asynchronous check run after all synchronous checks passed.
    AsyncRefined {
        inner: Schema,
        check: AsyncCheck,
        message: String,
    },
    /// A foreign validator embedded in the tree; opaque to introspection.
    Custom(Arc<dyn Validator>),
}

impl Shape {
    /// Sees through refinements and transforms down to an object shape.
    pub fn as_object(&self) -> Option<&ObjectShape> {
        match self {
            Shape::Object(object) => Some(object),
            Shape::Refined { inner, .. }
            | Shape::Transform { inner, .. }
            | Shape::AsyncRefined { inner, .. } => inner.shape().as_object(),
            _ => None,
        }
    }

    /// True if checking this node may have to await something: an async
    /// refinement or a foreign validator anywhere below it.
    pub(crate) fn may_suspend(&self) -> bool {
        match self {
            Shape::Literal(_) | Shape::Primitive(_) => false,
            Shape::Object(object) => {
                object.fields.values().any(|field| field.schema.may_suspend())
                    || matches!(&object.unknown, UnknownKeys::Validate(schema) if schema.may_suspend())
            }
            Shape::Tuple { items, rest } => items.iter().chain(rest).any(Schema::may_suspend),
            Shape::Array(item) => item.may_suspend(),
            Shape::Union(options) | Shape::Variant { options, .. } => {
                options.iter().any(Schema::may_suspend)
            }
            Shape::Refined { inner, .. } | Shape::Transform { inner, .. } => inner.may_suspend(),
            Shape::AsyncRefined { .. } | Shape::Custom(_) => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Literal(_) => "literal",
            Shape::Primitive(p) => p.name(),
            Shape::Object(_) => "object",
            Shape::Tuple { .. } => "tuple",
            Shape::Array(_) => "array",
            Shape::Union(_) => "union",
            Shape::Variant { .. } => "variant",
            Shape::Refined { .. } => "refined",
            Shape::Transform { .. } => "transform",
            Shape::AsyncRefined { .. } => "async",
            Shape::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Literal(value) => write!(f, "Literal({})", value),
            Shape::Primitive(p) => write!(f, "Primitive({})", p.name()),
            other => write!(f, "Shape::{}", other.kind()),
        }
    }
}

pub(crate) fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
