//! The validator contract consumed by the matching engine.
//!
//! Anything that can check (and possibly transform) a [`Value`] implements
//! [`Validator`]. The engine treats validators as opaque, except for the
//! optional introspection hints a validator family may expose:
//!
//! - [`Validator::shape`]: the declared definition tree of a native
//!   [`Schema`](crate::Schema)
//! - [`Validator::json_schema`]: a JSON Schema description of what the
//!   validator accepts
//! - [`Validator::matcher_slot`]: a place to attach the compiled matcher
//!   directly to the validator instead of the compiler's side table
//!
//! # Example
//!
//! ```rust
//! use schematch::{validator_fn, Issues, Validator};
//! use serde_json::json;
//! use stillwater::Validation;
//!
//! let even = validator_fn(|value| match value.as_i64() {
//!     Some(n) if n % 2 == 0 => Validation::Success(value.clone()),
//!     _ => Validation::Failure(Issues::message("expected an even integer")),
//! });
//!
//! assert!(even.validate(&json!(4)).into_ready().unwrap().is_success());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use stillwater::Validation;

use crate::compile::MatcherSlot;
use crate::error::Issues;
use crate::schema::Shape;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a completed validation: the (possibly transformed) value, or
/// the reasons it was rejected.
pub type Outcome = Validation<Value, Issues>;

/// What [`Validator::validate`] returns.
///
/// Synchronous validators answer with `Ready`. Validators that need to
/// suspend (I/O, async refinements) answer with `Pending`; synchronous
/// callers must report that as a usage error rather than a rejection.
pub enum Validated<'a> {
    Ready(Outcome),
    Pending(BoxFuture<'a, Outcome>),
}

impl<'a> Validated<'a> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Validated::Pending(_))
    }

    /// Returns the outcome if it is already available.
    pub fn into_ready(self) -> Option<Outcome> {
        match self {
            Validated::Ready(outcome) => Some(outcome),
            Validated::Pending(_) => None,
        }
    }

    /// Waits for the outcome.
    pub async fn settle(self) -> Outcome {
        match self {
            Validated::Ready(outcome) => outcome,
            Validated::Pending(pending) => pending.await,
        }
    }
}

impl From<Outcome> for Validated<'_> {
    fn from(outcome: Outcome) -> Self {
        Validated::Ready(outcome)
    }
}

/// The capability every schema must expose.
///
/// Implementations must be immutable from the engine's point of view: the
/// same instance is validated concurrently and its compiled matcher is
/// cached for the life of the process.
pub trait Validator: Send + Sync {
    /// Checks `value`, returning the validated output or the issues found.
    fn validate(&self, value: &Value) -> Validated<'_>;

    /// The declared definition tree, for validators of the native family.
    fn shape(&self) -> Option<&Shape> {
        None
    }

    /// A JSON Schema description of the accepted values.
    ///
    /// The description must be truthful (every accepted value satisfies
    /// it) but need not be exhaustive.
    fn json_schema(&self) -> Option<Value> {
        None
    }

    /// Storage for the compiled matcher, when the validator carries one.
    fn matcher_slot(&self) -> Option<&MatcherSlot> {
        None
    }
}

/// Conversion into a shared validator handle.
///
/// Passing an existing `Arc<dyn Validator>` keeps its identity, so its
/// compiled matcher is reused. Passing a validator by value allocates a new
/// handle.
pub trait IntoValidator {
    fn into_validator(self) -> Arc<dyn Validator>;
}

impl<V: Validator + 'static> IntoValidator for V {
    fn into_validator(self) -> Arc<dyn Validator> {
        Arc::new(self)
    }
}

impl IntoValidator for Arc<dyn Validator> {
    fn into_validator(self) -> Arc<dyn Validator> {
        self
    }
}

/// A validator backed by a synchronous closure.
pub struct FnValidator<F> {
    check: F,
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Outcome + Send + Sync,
{
    fn validate(&self, value: &Value) -> Validated<'_> {
        Validated::Ready((self.check)(value))
    }
}

/// Creates a validator from a synchronous closure.
pub fn validator_fn<F>(check: F) -> FnValidator<F>
where
    F: Fn(&Value) -> Outcome + Send + Sync,
{
    FnValidator { check }
}

/// A validator backed by a closure returning a future.
pub struct AsyncFnValidator<F> {
    check: F,
}

impl<F> Validator for AsyncFnValidator<F>
where
    F: Fn(Value) -> BoxFuture<'static, Outcome> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Validated<'_> {
        Validated::Pending((self.check)(value.clone()))
    }
}

/// Creates an always-asynchronous validator from a closure.
///
/// ```rust
/// use schematch::{async_validator_fn, Validator};
/// use serde_json::json;
/// use stillwater::Validation;
///
/// let lookup = async_validator_fn(|value| Box::pin(async move { Validation::Success(value) }));
/// assert!(lookup.validate(&json!("id-1")).is_pending());
/// ```
pub fn async_validator_fn<F>(check: F) -> AsyncFnValidator<F>
where
    F: Fn(Value) -> BoxFuture<'static, Outcome> + Send + Sync,
{
    AsyncFnValidator { check }
}
