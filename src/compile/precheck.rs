//! Cheap acceptance predicates derived from a validator's declared shape.
//!
//! A precheck approximates "could this validator accept this value". It is
//! either complete (passing it is equivalent to full validation, and the
//! output equals the input) or partial (a necessary condition only).
//! Completeness is conservative: any refinement, transform, default, async
//! check or opaque sub-schema anywhere in the tree makes it partial.

use std::collections::HashMap;

use serde_json::Value;

use crate::discriminant::Discriminant;
use crate::schema::{Presence, Primitive, Shape, UnknownKeys};

#[derive(Debug, Clone)]
pub(crate) enum Precheck {
    Any,
    Literal(Value),
    /// JSON Schema equality: numbers compare by value, so `1` equals `1.0`.
    Equal(Value),
    Kind(Primitive),
    Object {
        /// `(name, check, required)` per declared field.
        fields: Vec<(String, Precheck, bool)>,
        unknown: Unknown,
    },
    Tuple {
        items: Vec<Precheck>,
        rest: Option<Box<Precheck>>,
    },
    Array(Box<Precheck>),
    /// Passes when any option passes.
    Union(Vec<Precheck>),
    /// Passes when every part passes.
    All(Vec<Precheck>),
    Variant {
        key: String,
        table: HashMap<Discriminant, Vec<usize>>,
        /// Options without a literal for `key`; always candidates.
        open: Vec<usize>,
        options: Vec<Precheck>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum Unknown {
    Allow,
    Deny,
    Check(Box<Precheck>),
}

/// A derived precheck and whether it is complete.
#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub(crate) check: Precheck,
    pub(crate) complete: bool,
}

impl Derived {
    fn complete(check: Precheck) -> Self {
        Self {
            check,
            complete: true,
        }
    }

    fn partial(check: Precheck) -> Self {
        Self {
            check,
            complete: false,
        }
    }
}

/// Walks a native shape.
pub(crate) fn from_shape(shape: &Shape) -> Derived {
    match shape {
        Shape::Literal(value) => Derived::complete(Precheck::Literal(value.clone())),
        Shape::Primitive(Primitive::Any) => Derived::complete(Precheck::Any),
        Shape::Primitive(primitive) => Derived::complete(Precheck::Kind(*primitive)),
        Shape::Object(object) => {
            let mut complete = true;
            let mut fields = Vec::with_capacity(object.fields.len());
            for (name, field) in &object.fields {
                let derived = from_shape(field.schema.shape());
                complete &= derived.complete;
                let required = match field.presence {
                    Presence::Required => true,
                    Presence::Optional => false,
                    Presence::Default(_) => {
                        complete = false;
                        false
                    }
                };
                fields.push((name.clone(), derived.check, required));
            }
            let unknown = match &object.unknown {
                UnknownKeys::Allow => Unknown::Allow,
                UnknownKeys::Deny => Unknown::Deny,
                UnknownKeys::Validate(schema) => {
                    let derived = from_shape(schema.shape());
                    complete &= derived.complete;
                    Unknown::Check(Box::new(derived.check))
                }
            };
            Derived {
                check: Precheck::Object { fields, unknown },
                complete,
            }
        }
        Shape::Tuple { items, rest } => {
            let mut complete = true;
            let items = items
                .iter()
                .map(|item| {
                    let derived = from_shape(item.shape());
                    complete &= derived.complete;
                    derived.check
                })
                .collect();
            let rest = rest.as_ref().map(|rest| {
                let derived = from_shape(rest.shape());
                complete &= derived.complete;
                Box::new(derived.check)
            });
            Derived {
                check: Precheck::Tuple { items, rest },
                complete,
            }
        }
        Shape::Array(item) => {
            let derived = from_shape(item.shape());
            Derived {
                check: Precheck::Array(Box::new(derived.check)),
                complete: derived.complete,
            }
        }
        Shape::Union(options) => {
            let derived: Vec<Derived> = options.iter().map(|o| from_shape(o.shape())).collect();
            let complete = derived.iter().all(|d| d.complete);
            Derived {
                check: Precheck::Union(derived.into_iter().map(|d| d.check).collect()),
                complete,
            }
        }
        Shape::Variant { key, options } => {
            let mut table: HashMap<Discriminant, Vec<usize>> = HashMap::new();
            let mut open = Vec::new();
            let mut checks = Vec::with_capacity(options.len());
            let mut complete = true;
            for (idx, option) in options.iter().enumerate() {
                let literal = option
                    .shape()
                    .as_object()
                    .and_then(|object| object.literal_field(key))
                    .and_then(Discriminant::from_value);
                match literal {
                    Some(tag) => table.entry(tag).or_default().push(idx),
                    None => open.push(idx),
                }
                let derived = from_shape(option.shape());
                complete &= derived.complete;
                checks.push(derived.check);
            }
            Derived {
                check: Precheck::Variant {
                    key: key.clone(),
                    table,
                    open,
                    options: checks,
                },
                complete,
            }
        }
        Shape::Refined { inner, .. }
        | Shape::Transform { inner, .. }
        | Shape::AsyncRefined { inner, .. } => Derived::partial(from_shape(inner.shape()).check),
        Shape::Custom(_) => Derived::partial(Precheck::Any),
    }
}

/// Reads a JSON Schema description. The result is always partial.
///
/// Only keywords whose meaning is unambiguous are used; anything else is
/// ignored, which only weakens the check. `integer` is read as "number"
/// because JSON Schema accepts `1.0` as an integer.
pub(crate) fn from_json_schema(schema: &Value) -> Derived {
    Derived::partial(describe(schema))
}

fn describe(schema: &Value) -> Precheck {
    let Some(keywords) = schema.as_object() else {
        return Precheck::Any;
    };

    if let Some(constant) = keywords.get("const") {
        return Precheck::Equal(constant.clone());
    }

    let mut parts = Vec::new();

    if let Some(Value::Array(values)) = keywords.get("enum") {
        parts.push(Precheck::Union(
            values.iter().cloned().map(Precheck::Equal).collect(),
        ));
    }

    let types: Vec<&str> = match keywords.get("type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    let kinds: Vec<Precheck> = types.iter().filter_map(|name| json_kind(name)).collect();
    if !kinds.is_empty() && kinds.len() == types.len() {
        parts.push(Precheck::Union(kinds));
    }

    if types == ["object"] {
        if let Some(object) = describe_object(keywords) {
            parts.push(object);
        }
    }
    if types == ["array"] {
        if let Some(items) = keywords.get("items").filter(|items| items.is_object()) {
            parts.push(Precheck::Array(Box::new(describe(items))));
        }
    }

    for combinator in ["anyOf", "oneOf"] {
        if let Some(Value::Array(options)) = keywords.get(combinator) {
            if !options.is_empty() {
                parts.push(Precheck::Union(options.iter().map(describe).collect()));
            }
        }
    }

    match parts.len() {
        0 => Precheck::Any,
        1 => parts.pop().unwrap_or(Precheck::Any),
        _ => Precheck::All(parts),
    }
}

fn describe_object(keywords: &serde_json::Map<String, Value>) -> Option<Precheck> {
    let required: Vec<&str> = match keywords.get("required") {
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    let properties = keywords.get("properties").and_then(Value::as_object);

    let mut fields: Vec<(String, Precheck, bool)> = properties
        .map(|props| {
            props
                .iter()
                .map(|(name, sub)| (name.clone(), describe(sub), required.contains(&name.as_str())))
                .collect()
        })
        .unwrap_or_default();
    for name in &required {
        if !fields.iter().any(|(declared, _, _)| declared == name) {
            fields.push((name.to_string(), Precheck::Any, true));
        }
    }

    (!fields.is_empty()).then_some(Precheck::Object {
        fields,
        unknown: Unknown::Allow,
    })
}

fn json_kind(name: &str) -> Option<Precheck> {
    let primitive = match name {
        "null" => Primitive::Null,
        "boolean" => Primitive::Boolean,
        "number" | "integer" => Primitive::Number,
        "string" => Primitive::String,
        "array" => return Some(Precheck::Array(Box::new(Precheck::Any))),
        "object" => {
            return Some(Precheck::Object {
                fields: Vec::new(),
                unknown: Unknown::Allow,
            })
        }
        _ => return None,
    };
    Some(Precheck::Kind(primitive))
}

impl Precheck {
    pub(crate) fn passes(&self, value: &Value) -> bool {
        match self {
            Precheck::Any => true,
            Precheck::Literal(expected) => value == expected,
            Precheck::Equal(expected) => json_equal(value, expected),
            Precheck::Kind(primitive) => primitive.accepts(value),
            Precheck::Object { fields, unknown } => {
                let Some(obj) = value.as_object() else {
                    return false;
                };
                let declared_ok = fields.iter().all(|(name, check, required)| match obj.get(name) {
                    Some(field) => check.passes(field),
                    None => !required,
                });
                if !declared_ok {
                    return false;
                }
                match unknown {
                    Unknown::Allow => true,
                    Unknown::Deny => obj
                        .keys()
                        .all(|key| fields.iter().any(|(name, _, _)| name == key)),
                    Unknown::Check(check) => obj.iter().all(|(key, field)| {
                        fields.iter().any(|(name, _, _)| name == key) || check.passes(field)
                    }),
                }
            }
            Precheck::Tuple { items, rest } => {
                let Some(array) = value.as_array() else {
                    return false;
                };
                let length_ok = match rest {
                    Some(_) => array.len() >= items.len(),
                    None => array.len() == items.len(),
                };
                length_ok
                    && array.iter().enumerate().all(|(idx, item)| {
                        match items.get(idx).or(rest.as_deref()) {
                            Some(check) => check.passes(item),
                            None => true,
                        }
                    })
            }
            Precheck::Array(item) => value
                .as_array()
                .is_some_and(|array| array.iter().all(|v| item.passes(v))),
            Precheck::Union(options) => options.iter().any(|option| option.passes(value)),
            Precheck::All(parts) => parts.iter().all(|part| part.passes(value)),
            Precheck::Variant {
                key,
                table,
                open,
                options,
            } => {
                let Some(obj) = value.as_object() else {
                    return false;
                };
                let tagged = obj
                    .get(key)
                    .and_then(Discriminant::from_value)
                    .and_then(|tag| table.get(&tag))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                tagged
                    .iter()
                    .chain(open)
                    .any(|&idx| options.get(idx).is_some_and(|option| option.passes(value)))
            }
        }
    }
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}
