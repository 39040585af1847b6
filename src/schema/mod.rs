//! Native schemas: the introspectable validator family.
//!
//! A [`Schema`] is a shared, immutable definition tree ([`Shape`]) that
//! validates JSON values, accumulating every issue it finds. Because its
//! structure is visible, the compiler can derive cheap prechecks from it,
//! use literal fast paths, and find discriminator fields for dispatch.
//!
//! Cloning a `Schema` shares the same tree and the same compiled-matcher
//! slot; building a structurally identical schema twice yields two
//! independent instances.
//!
//! # Example
//!
//! ```rust
//! use schematch::{Schema, Validator};
//! use serde_json::json;
//!
//! let ok = Schema::object()
//!     .field("type", Schema::literal("ok"))
//!     .field("value", Schema::number())
//!     .build();
//!
//! let outcome = ok.validate(&json!({"type": "ok", "value": 1})).into_ready().unwrap();
//! assert!(outcome.is_success());
//! ```

mod check;
mod object;
mod refine;
mod shape;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use stillwater::Validation;

use crate::compile::MatcherSlot;
use crate::error::{Issue, Issues};
use crate::validator::{Outcome, Validated, Validator};

pub(crate) use check::{check_shape, check_shape_async, CheckCx, Mode};
pub use object::ObjectSchema;
pub use shape::{
    AsyncCheck, Field, MapFn, ObjectShape, Presence, Primitive, Rule, Shape, UnknownKeys,
};

pub(crate) use shape::is_scalar;

struct SchemaNode {
    shape: Shape,
    slot: MatcherSlot,
    suspends: bool,
}

/// A native, introspectable schema.
#[derive(Clone)]
pub struct Schema(Arc<SchemaNode>);

impl Schema {
    /// Wraps a definition tree in a new schema instance.
    pub fn from_shape(shape: Shape) -> Self {
        let suspends = shape.may_suspend();
        Schema(Arc::new(SchemaNode {
            shape,
            slot: MatcherSlot::default(),
            suspends,
        }))
    }

    pub(crate) fn may_suspend(&self) -> bool {
        self.0.suspends
    }

    /// The declared definition tree.
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Accepts exactly `value`.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::from_shape(Shape::Literal(value.into()))
    }

    pub fn any() -> Self {
        Self::from_shape(Shape::Primitive(Primitive::Any))
    }

    pub fn null() -> Self {
        Self::from_shape(Shape::Primitive(Primitive::Null))
    }

    pub fn boolean() -> Self {
        Self::from_shape(Shape::Primitive(Primitive::Boolean))
    }

    pub fn number() -> Self {
        Self::from_shape(Shape::Primitive(Primitive::Number))
    }

    /// Accepts integral numbers only; `1.5` is rejected.
    pub fn integer() -> Self {
        Self::from_shape(Shape::Primitive(Primitive::Integer))
    }

    pub fn string() -> Self {
        Self::from_shape(Shape::Primitive(Primitive::String))
    }

    /// Starts an object schema builder.
    ///
    /// ```rust
    /// use schematch::{Schema, Validator};
    /// use serde_json::json;
    ///
    /// let user = Schema::object()
    ///     .field("name", Schema::string().min_len(1))
    ///     .optional("email", Schema::string())
    ///     .default("role", Schema::string(), json!("user"))
    ///     .build();
    ///
    /// let out = user.validate(&json!({"name": "Ada"})).into_ready().unwrap();
    /// assert_eq!(out.into_result().unwrap(), json!({"name": "Ada", "role": "user"}));
    /// ```
    pub fn object() -> ObjectSchema {
        ObjectSchema::new()
    }

    /// Arrays whose every item matches `item`.
    pub fn array(item: impl Into<Schema>) -> Self {
        Self::from_shape(Shape::Array(item.into()))
    }

    /// Arrays of exactly `items.len()` positions.
    pub fn tuple(items: Vec<Schema>) -> Self {
        Self::from_shape(Shape::Tuple { items, rest: None })
    }

    /// Arrays starting with `items`, followed by any number of `rest` items.
    pub fn tuple_with_rest(items: Vec<Schema>, rest: impl Into<Schema>) -> Self {
        Self::from_shape(Shape::Tuple {
            items,
            rest: Some(rest.into()),
        })
    }

    /// The first option accepting the value wins.
    pub fn union(options: Vec<Schema>) -> Self {
        Self::from_shape(Shape::Union(options))
    }

    /// Options routed by the literal value each declares for `key`.
    ///
    /// ```rust
    /// use schematch::{Schema, Validator};
    /// use serde_json::json;
    ///
    /// let event = Schema::variant("kind", vec![
    ///     Schema::object().field("kind", Schema::literal("click")).field("x", Schema::integer()).build(),
    ///     Schema::object().field("kind", Schema::literal("key")).field("code", Schema::string()).build(),
    /// ]);
    ///
    /// let out = event.validate(&json!({"kind": "key", "code": "Enter"})).into_ready().unwrap();
    /// assert!(out.is_success());
    /// ```
    pub fn variant(key: impl Into<String>, options: Vec<Schema>) -> Self {
        Self::from_shape(Shape::Variant {
            key: key.into(),
            options,
        })
    }

    /// Embeds a foreign validator. The tree becomes opaque at this node.
    pub fn custom(validator: Arc<dyn Validator>) -> Self {
        Self::from_shape(Shape::Custom(validator))
    }
}

fn finish(output: Option<Value>, issues: Vec<Issue>) -> Outcome {
    if let Some(issues) = Issues::from_vec(issues) {
        return Validation::Failure(issues);
    }
    match output {
        Some(output) => Validation::Success(output),
        None => Validation::Failure(Issues::message("value rejected")),
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(self.shape()).finish()
    }
}

impl Validator for Schema {
    fn validate(&self, value: &Value) -> Validated<'_> {
        let mut cx = CheckCx::new(Mode::Collect);
        let output = check_shape(self.shape(), value, &mut cx);
        if !cx.deferred || (!cx.issues.is_empty() && !cx.guessed) {
            return Validated::Ready(finish(output, cx.issues));
        }

        let value = value.clone();
        Validated::Pending(Box::pin(async move {
            let mut cx = CheckCx::new(Mode::Collect);
            let output = check_shape_async(self.shape(), &value, &mut cx).await;
            finish(output, cx.issues)
        }))
    }

    fn shape(&self) -> Option<&Shape> {
        Some(&self.0.shape)
    }

    fn matcher_slot(&self) -> Option<&MatcherSlot> {
        Some(&self.0.slot)
    }
}
