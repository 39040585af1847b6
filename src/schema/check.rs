//! The internal checker shared by full validation and compiled matchers.
//!
//! [`check_shape`] walks a [`Shape`] against a value. In `Collect` mode it
//! records every issue, like the public `validate` does; in `FailFast` mode
//! it stops at the first failure and allocates no issues, which is what the
//! compiled matcher uses on the hot path.
//!
//! The synchronous walk never awaits. When it meets an async refinement it
//! marks the context `deferred`; when it meets a pending foreign validator it
//! also marks it `guessed`, since the output and any later failure depend on
//! a result it does not have yet. Callers then rerun the tree with
//! [`check_shape_async`], which awaits every check inline so that union and
//! variant options fall through on asynchronous failures too.

use serde_json::{Map, Value};
use stillwater::Validation;

use crate::discriminant::Discriminant;
use crate::error::{Issue, Issues};
use crate::path::{IssuePath, PathSegment};
use crate::schema::shape::{ObjectShape, Presence, Rule, Shape, UnknownKeys};
use crate::schema::Schema;
use crate::validator::{BoxFuture, Validated};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Collect,
    FailFast,
}

pub(crate) struct CheckCx {
    mode: Mode,
    path: IssuePath,
    pub(crate) issues: Vec<Issue>,
    /// An asynchronous check was skipped.
    pub(crate) deferred: bool,
    /// Some output stands in for an asynchronous result; failures seen
    /// after it may not hold.
    pub(crate) guessed: bool,
}

impl CheckCx {
    pub(crate) fn new(mode: Mode) -> Self {
        Self {
            mode,
            path: IssuePath::root(),
            issues: Vec::new(),
            deferred: false,
            guessed: false,
        }
    }

    /// A fail-fast context for trying one union or variant option.
    fn trial(&self) -> Self {
        Self {
            mode: Mode::FailFast,
            path: self.path.clone(),
            issues: Vec::new(),
            deferred: false,
            guessed: false,
        }
    }

    /// Carries a tried option's async state over to this walk.
    ///
    /// An option that matched but skipped an async check may still fail
    /// later, and then another option would win.
    fn absorb(&mut self, trial: &CheckCx, matched: bool) {
        if trial.guessed || (matched && trial.deferred) {
            self.deferred = true;
            self.guessed = true;
        }
    }

    fn fail_fast(&self) -> bool {
        self.mode == Mode::FailFast
    }

    /// Records an issue at the current path (only when collecting).
    fn reject(&mut self, make: impl FnOnce() -> Issue) -> Option<Value> {
        if self.mode == Mode::Collect {
            let issue = make().at(self.path.clone());
            self.issues.push(issue);
        }
        None
    }

    fn nested<T>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Records a foreign validator's issues under the current path.
    fn foreign(&mut self, issues: Issues) {
        if self.mode == Mode::Collect {
            for issue in issues {
                let path = issue.path.prefixed(&self.path);
                self.issues.push(issue.at(path));
            }
        }
    }
}

pub(crate) fn check(schema: &Schema, value: &Value, cx: &mut CheckCx) -> Option<Value> {
    check_shape(schema.shape(), value, cx)
}

pub(crate) fn check_shape(shape: &Shape, value: &Value, cx: &mut CheckCx) -> Option<Value> {
    match shape {
        Shape::Literal(expected) => {
            if value == expected {
                Some(value.clone())
            } else {
                cx.reject(|| {
                    Issue::new(format!("expected literal {}", expected)).with_code("invalid_literal")
                })
            }
        }
        Shape::Primitive(primitive) => {
            if primitive.accepts(value) {
                Some(value.clone())
            } else {
                mismatch(primitive.name(), value, cx)
            }
        }
        Shape::Object(object) => {
            let obj = value.as_object().or_else(|| {
                mismatch("object", value, cx);
                None
            })?;

            let mut ok = true;
            let mut validated = Map::new();

            for (name, field) in &object.fields {
                match obj.get(name) {
                    Some(field_value) => {
                        let out = cx.nested(PathSegment::Key(name.clone()), |cx| {
                            check(&field.schema, field_value, cx)
                        });
                        match out {
                            Some(v) => {
                                validated.insert(name.clone(), v);
                            }
                            None => ok = false,
                        }
                    }
                    None => ok &= absent_field(name, &field.presence, &mut validated, cx),
                }
                if !ok && cx.fail_fast() {
                    return None;
                }
            }

            for (key, extra) in obj {
                if object.fields.contains_key(key) {
                    continue;
                }
                match &object.unknown {
                    UnknownKeys::Allow => {
                        validated.insert(key.clone(), extra.clone());
                    }
                    UnknownKeys::Deny => {
                        ok = false;
                        deny_field(key, cx);
                    }
                    UnknownKeys::Validate(schema) => {
                        let out =
                            cx.nested(PathSegment::Key(key.clone()), |cx| check(schema, extra, cx));
                        match out {
                            Some(v) => {
                                validated.insert(key.clone(), v);
                            }
                            None => ok = false,
                        }
                    }
                }
                if !ok && cx.fail_fast() {
                    return None;
                }
            }

            ok.then_some(Value::Object(validated))
        }
        Shape::Tuple { items, rest } => {
            let array = tuple_items(items, rest.as_ref(), value, cx)?;
            check_items(array, |idx| items.get(idx).or(rest.as_ref()), cx)
        }
        Shape::Array(item) => {
            let array = value.as_array().or_else(|| {
                mismatch("array", value, cx);
                None
            })?;
            check_items(array, |_| Some(item), cx)
        }
        Shape::Union(options) => {
            for option in options {
                let mut trial = cx.trial();
                let out = check(option, value, &mut trial);
                cx.absorb(&trial, out.is_some());
                if out.is_some() {
                    return out;
                }
            }
            no_option(options.len(), cx)
        }
        Shape::Variant { key, options } => {
            let obj = value.as_object().or_else(|| {
                mismatch("object", value, cx);
                None
            })?;
            let candidates = variant_candidates(key, options, obj);
            if candidates.is_empty() {
                return unknown_tag(key, options, obj, cx);
            }

            for option in &candidates {
                let mut trial = cx.trial();
                let out = check(option, value, &mut trial);
                cx.absorb(&trial, out.is_some());
                if out.is_some() {
                    return out;
                }
            }

            // Report the most specific candidate's issues.
            if cx.mode == Mode::Collect {
                check(candidates[0], value, cx);
            }
            None
        }
        Shape::Refined {
            inner,
            rule,
            message,
        } => {
            let out = check(inner, value, cx)?;
            apply_rule(out, rule, message.as_deref(), cx)
        }
        Shape::Transform { inner, map } => check(inner, value, cx).map(|v| map(v)),
        Shape::AsyncRefined { inner, .. } => {
            let out = check(inner, value, cx)?;
            cx.deferred = true;
            Some(out)
        }
        Shape::Custom(validator) => match validator.validate(value) {
            Validated::Ready(Validation::Success(v)) => Some(v),
            Validated::Ready(Validation::Failure(issues)) => {
                cx.foreign(issues);
                None
            }
            Validated::Pending(_) => {
                cx.deferred = true;
                cx.guessed = true;
                Some(value.clone())
            }
        },
    }
}

fn check_items<'s>(
    array: &[Value],
    schema_at: impl Fn(usize) -> Option<&'s Schema>,
    cx: &mut CheckCx,
) -> Option<Value> {
    let mut ok = true;
    let mut validated = Vec::with_capacity(array.len());
    for (idx, item) in array.iter().enumerate() {
        let Some(schema) = schema_at(idx) else {
            continue;
        };
        match cx.nested(PathSegment::Index(idx), |cx| check(schema, item, cx)) {
            Some(v) => validated.push(v),
            None => {
                ok = false;
                if cx.fail_fast() {
                    return None;
                }
            }
        }
    }
    ok.then_some(Value::Array(validated))
}

/// Checks a tree awaiting every asynchronous part inline.
///
/// Subtrees that cannot suspend go through the synchronous walk.
pub(crate) fn check_async<'a>(
    schema: &'a Schema,
    value: &'a Value,
    cx: &'a mut CheckCx,
) -> BoxFuture<'a, Option<Value>> {
    if !schema.may_suspend() {
        let out = check(schema, value, cx);
        return Box::pin(std::future::ready(out));
    }
    check_shape_async(schema.shape(), value, cx)
}

pub(crate) fn check_shape_async<'a>(
    shape: &'a Shape,
    value: &'a Value,
    cx: &'a mut CheckCx,
) -> BoxFuture<'a, Option<Value>> {
    Box::pin(async move {
        match shape {
            Shape::Literal(_) | Shape::Primitive(_) => check_shape(shape, value, cx),
            Shape::Object(object) => check_object_async(object, value, cx).await,
            Shape::Tuple { items, rest } => {
                let array = tuple_items(items, rest.as_ref(), value, cx)?;
                check_items_async(array, |idx| items.get(idx).or(rest.as_ref()), cx).await
            }
            Shape::Array(item) => {
                let Some(array) = value.as_array() else {
                    return mismatch("array", value, cx);
                };
                check_items_async(array, |_| Some(item), cx).await
            }
            Shape::Union(options) => {
                for option in options {
                    let mut trial = cx.trial();
                    if let Some(v) = check_async(option, value, &mut trial).await {
                        return Some(v);
                    }
                }
                no_option(options.len(), cx)
            }
            Shape::Variant { key, options } => {
                let Some(obj) = value.as_object() else {
                    return mismatch("object", value, cx);
                };
                let candidates = variant_candidates(key, options, obj);
                if candidates.is_empty() {
                    return unknown_tag(key, options, obj, cx);
                }
                for option in &candidates {
                    let mut trial = cx.trial();
                    if let Some(v) = check_async(option, value, &mut trial).await {
                        return Some(v);
                    }
                }
                if cx.mode == Mode::Collect {
                    check_async(candidates[0], value, cx).await;
                }
                None
            }
            Shape::Refined {
                inner,
                rule,
                message,
            } => {
                let out = check_async(inner, value, cx).await?;
                apply_rule(out, rule, message.as_deref(), cx)
            }
            Shape::Transform { inner, map } => check_async(inner, value, cx).await.map(|v| map(v)),
            Shape::AsyncRefined {
                inner,
                check: async_check,
                message,
            } => {
                let out = check_async(inner, value, cx).await?;
                if async_check(out.clone()).await {
                    Some(out)
                } else {
                    cx.reject(|| Issue::new(message.clone()).with_code("async_refinement"))
                }
            }
            Shape::Custom(validator) => match validator.validate(value).settle().await {
                Validation::Success(v) => Some(v),
                Validation::Failure(issues) => {
                    cx.foreign(issues);
                    None
                }
            },
        }
    })
}

async fn check_object_async(
    object: &ObjectShape,
    value: &Value,
    cx: &mut CheckCx,
) -> Option<Value> {
    let Some(obj) = value.as_object() else {
        return mismatch("object", value, cx);
    };

    let mut ok = true;
    let mut validated = Map::new();

    for (name, field) in &object.fields {
        match obj.get(name) {
            Some(field_value) => {
                cx.path.push(PathSegment::Key(name.clone()));
                let out = check_async(&field.schema, field_value, cx).await;
                cx.path.pop();
                match out {
                    Some(v) => {
                        validated.insert(name.clone(), v);
                    }
                    None => ok = false,
                }
            }
            None => ok &= absent_field(name, &field.presence, &mut validated, cx),
        }
        if !ok && cx.fail_fast() {
            return None;
        }
    }

    for (key, extra) in obj {
        if object.fields.contains_key(key) {
            continue;
        }
        match &object.unknown {
            UnknownKeys::Allow => {
                validated.insert(key.clone(), extra.clone());
            }
            UnknownKeys::Deny => {
                ok = false;
                deny_field(key, cx);
            }
            UnknownKeys::Validate(schema) => {
                cx.path.push(PathSegment::Key(key.clone()));
                let out = check_async(schema, extra, cx).await;
                cx.path.pop();
                match out {
                    Some(v) => {
                        validated.insert(key.clone(), v);
                    }
                    None => ok = false,
                }
            }
        }
        if !ok && cx.fail_fast() {
            return None;
        }
    }

    ok.then_some(Value::Object(validated))
}

async fn check_items_async<'s>(
    array: &[Value],
    schema_at: impl Fn(usize) -> Option<&'s Schema>,
    cx: &mut CheckCx,
) -> Option<Value> {
    let mut ok = true;
    let mut validated = Vec::with_capacity(array.len());
    for (idx, item) in array.iter().enumerate() {
        let Some(schema) = schema_at(idx) else {
            continue;
        };
        cx.path.push(PathSegment::Index(idx));
        let out = check_async(schema, item, cx).await;
        cx.path.pop();
        match out {
            Some(v) => validated.push(v),
            None => {
                ok = false;
                if cx.fail_fast() {
                    return None;
                }
            }
        }
    }
    ok.then_some(Value::Array(validated))
}

fn mismatch(expected: &str, value: &Value, cx: &mut CheckCx) -> Option<Value> {
    cx.reject(|| {
        Issue::new(format!("expected {}, got {}", expected, type_name(value)))
            .with_code("invalid_type")
    })
}

/// Handles a declared field missing from the input. Returns false if that
/// is a failure.
fn absent_field(
    name: &str,
    presence: &Presence,
    validated: &mut Map<String, Value>,
    cx: &mut CheckCx,
) -> bool {
    match presence {
        Presence::Required => {
            cx.nested(PathSegment::Key(name.to_string()), |cx| {
                cx.reject(|| {
                    Issue::new(format!("required field '{}' is missing", name))
                        .with_code("required")
                })
            });
            false
        }
        Presence::Optional => true,
        Presence::Default(default) => {
            validated.insert(name.to_string(), default.clone());
            true
        }
    }
}

fn deny_field(key: &str, cx: &mut CheckCx) {
    cx.nested(PathSegment::Key(key.to_string()), |cx| {
        cx.reject(|| Issue::new(format!("unknown field '{}'", key)).with_code("unknown_field"))
    });
}

fn tuple_items<'v>(
    items: &[Schema],
    rest: Option<&Schema>,
    value: &'v Value,
    cx: &mut CheckCx,
) -> Option<&'v Vec<Value>> {
    let Some(array) = value.as_array() else {
        mismatch("tuple", value, cx);
        return None;
    };
    let length_ok = match rest {
        Some(_) => array.len() >= items.len(),
        None => array.len() == items.len(),
    };
    if !length_ok {
        let n = items.len();
        let at_least = rest.is_some();
        cx.reject(|| {
            let expected = if at_least {
                format!("at least {}", n)
            } else {
                n.to_string()
            };
            Issue::new(format!("expected {} items, got {}", expected, array.len()))
                .with_code("tuple_length")
        });
        return None;
    }
    Some(array)
}

fn apply_rule(out: Value, rule: &Rule, message: Option<&str>, cx: &mut CheckCx) -> Option<Value> {
    if rule.holds(&out) {
        Some(out)
    } else {
        cx.reject(|| {
            let text = message.map_or_else(|| rule.describe(), str::to_string);
            Issue::new(text).with_code(rule.code())
        })
    }
}

fn no_option(n: usize, cx: &mut CheckCx) -> Option<Value> {
    cx.reject(|| {
        Issue::new(format!("value did not match any of {} options", n))
            .with_code("union_none_matched")
    })
}

/// Options whose declared tag agrees with the input's, plus options that
/// declare none.
fn variant_candidates<'s>(
    key: &str,
    options: &'s [Schema],
    obj: &Map<String, Value>,
) -> Vec<&'s Schema> {
    let tag = obj.get(key).and_then(Discriminant::from_value);
    options
        .iter()
        .filter(|option| match option.shape().as_object().and_then(|o| o.literal_field(key)) {
            Some(literal) => tag.as_ref() == Discriminant::from_value(literal).as_ref(),
            None => true,
        })
        .collect()
}

fn unknown_tag(
    key: &str,
    options: &[Schema],
    obj: &Map<String, Value>,
    cx: &mut CheckCx,
) -> Option<Value> {
    let expected: Vec<String> = options
        .iter()
        .filter_map(|o| o.shape().as_object().and_then(|o| o.literal_field(key)))
        .map(|v| v.to_string())
        .collect();
    cx.nested(PathSegment::Key(key.to_string()), |cx| {
        cx.reject(|| {
            let got = obj
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "nothing".to_string());
            Issue::new(format!(
                "invalid discriminator: expected one of {}, got {}",
                expected.join(", "),
                got
            ))
            .with_code("invalid_discriminator")
        })
    })
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
