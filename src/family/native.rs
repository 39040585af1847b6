use serde_json::Value;

use crate::compile::precheck::{self, Precheck};
use crate::compile::{generic_attempt, generic_attempt_async, Accelerated, Attempt};
use crate::discriminant::Discriminator;
use crate::family::{pick_discriminator, FamilyAdapter};
use crate::schema::{check_shape, check_shape_async, is_scalar, CheckCx, Mode, Shape};
use crate::validator::{BoxFuture, Validator};

/// Adapter for native [`Schema`](crate::Schema) trees.
///
/// Matching runs the internal fail-fast checker directly, after a precheck
/// derived from the tree. When the precheck is complete it alone decides
/// the match.
pub struct NativeFamily;

impl FamilyAdapter for NativeFamily {
    fn name(&self) -> &'static str {
        "native"
    }

    fn detect(&self, validator: &dyn Validator) -> bool {
        validator.shape().is_some()
    }

    fn literal(&self, validator: &dyn Validator) -> Option<Value> {
        match validator.shape()? {
            Shape::Literal(value) if is_scalar(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn compile_accelerated(&self, validator: &dyn Validator) -> Option<Box<dyn Accelerated>> {
        let derived = precheck::from_shape(validator.shape()?);
        Some(Box::new(NativeMatcher {
            precheck: derived.check,
            complete: derived.complete,
        }))
    }

    fn extract_discriminator(
        &self,
        validator: &dyn Validator,
        priority: &[String],
    ) -> Option<Discriminator> {
        let object = validator.shape()?.as_object()?;
        pick_discriminator(object.literal_fields(), priority)
    }
}

struct NativeMatcher {
    precheck: Precheck,
    complete: bool,
}

impl NativeMatcher {
    /// Decides the match without awaiting, if the synchronous walk can.
    fn run(&self, shape: &Shape, input: &Value) -> Option<Attempt> {
        if !self.precheck.passes(input) {
            return Some(Attempt::NoMatch);
        }
        if self.complete {
            return Some(Attempt::Matched(input.clone()));
        }
        let mut cx = CheckCx::new(Mode::FailFast);
        match check_shape(shape, input, &mut cx) {
            Some(output) if !cx.deferred => Some(Attempt::Matched(output)),
            None if !cx.guessed => Some(Attempt::NoMatch),
            _ => None,
        }
    }
}

impl Accelerated for NativeMatcher {
    fn attempt(&self, validator: &dyn Validator, input: &Value) -> Attempt {
        let Some(shape) = validator.shape() else {
            return generic_attempt(validator, input);
        };
        self.run(shape, input).unwrap_or(Attempt::AsyncRequired)
    }

    fn attempt_async<'a>(
        &'a self,
        validator: &'a dyn Validator,
        input: &'a Value,
    ) -> BoxFuture<'a, Attempt> {
        let Some(shape) = validator.shape() else {
            return generic_attempt_async(validator, input);
        };
        match self.run(shape, input) {
            Some(decided) => Box::pin(async move { decided }),
            None => Box::pin(async move {
                let mut cx = CheckCx::new(Mode::FailFast);
                match check_shape_async(shape, input, &mut cx).await {
                    Some(output) => Attempt::Matched(output),
                    None => Attempt::NoMatch,
                }
            }),
        }
    }
}
