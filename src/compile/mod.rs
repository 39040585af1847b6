//! Compiling validators into fast matchers.
//!
//! [`Compiler::compile`] turns any validator into a [`CompiledMatcher`]
//! using the first applicable strategy:
//!
//! 1. **Literal**: the validator accepts exactly one scalar; matching is a
//!    single equality test and never calls `validate`.
//! 2. **Accelerated**: a [`FamilyAdapter`] recognized the validator and
//!    provided a faster check, usually guarded by a precheck.
//! 3. **Generic**: `validate` is called through the [`Validator`] contract.
//!
//! Compiled plans are cached by validator identity, on the validator's own
//! [`MatcherSlot`] when it has one and in an identity-keyed side table
//! otherwise. A plan is built once and never recompiled; structurally equal
//! validators compile independently.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use schematch::{compile_matcher, Attempt, Schema, Validator};
//! use serde_json::json;
//!
//! let schema: Arc<dyn Validator> = Arc::new(Schema::literal("ok"));
//! let matcher = compile_matcher(&schema);
//!
//! assert_eq!(matcher.family(), "native");
//! assert!(matches!(matcher.sync_attempt(&json!("ok")), Attempt::Matched(_)));
//! assert!(matches!(matcher.sync_attempt(&json!("no")), Attempt::NoMatch));
//! ```

mod cache;
pub(crate) mod precheck;

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use stillwater::Validation;

use crate::discriminant::Discriminator;
use crate::family::{default_adapters, FamilyAdapter};
use crate::validator::{BoxFuture, Validated, Validator};

pub use cache::MatcherSlot;
pub(crate) use cache::SideTable;

/// Result of one compiled match attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    NoMatch,
    /// The synchronous path reached an asynchronous validator.
    AsyncRequired,
    /// The validator accepted the input, producing this output.
    Matched(Value),
}

/// A family-specific fast check.
///
/// Implementations hold only derived data; the validator is passed in on
/// every call so the cached plan never owns it.
pub trait Accelerated: Send + Sync {
    fn attempt(&self, validator: &dyn Validator, input: &Value) -> Attempt;

    fn attempt_async<'a>(
        &'a self,
        validator: &'a dyn Validator,
        input: &'a Value,
    ) -> BoxFuture<'a, Attempt>;
}

pub(crate) enum Strategy {
    Literal(Value),
    Accelerated(Box<dyn Accelerated>),
    Generic,
}

impl Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Literal(_) => "literal",
            Strategy::Accelerated(_) => "accelerated",
            Strategy::Generic => "generic",
        }
    }
}

/// The cached, validator-independent part of a compiled matcher.
pub struct MatchPlan {
    pub(crate) family: &'static str,
    pub(crate) strategy: Strategy,
}

impl fmt::Debug for MatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchPlan")
            .field("family", &self.family)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// A validator paired with its compiled plan.
///
/// Cloning is cheap; clones share the validator and the plan.
#[derive(Clone)]
pub struct CompiledMatcher {
    validator: Arc<dyn Validator>,
    plan: Arc<MatchPlan>,
}

impl CompiledMatcher {
    /// Name of the family adapter that compiled the validator, or
    /// `"generic"` when none recognized it.
    pub fn family(&self) -> &'static str {
        self.plan.family
    }

    /// Name of the selected strategy: `literal`, `accelerated` or `generic`.
    pub fn strategy(&self) -> &'static str {
        self.plan.strategy.name()
    }

    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    /// Returns true if both matchers share the same cached plan.
    pub fn same_plan(&self, other: &CompiledMatcher) -> bool {
        Arc::ptr_eq(&self.plan, &other.plan)
    }

    /// Attempts a match without suspending.
    pub fn sync_attempt(&self, input: &Value) -> Attempt {
        match &self.plan.strategy {
            Strategy::Literal(literal) => literal_attempt(literal, input),
            Strategy::Accelerated(accelerated) => accelerated.attempt(self.validator.as_ref(), input),
            Strategy::Generic => generic_attempt(self.validator.as_ref(), input),
        }
    }

    /// Attempts a match, awaiting asynchronous validation.
    ///
    /// Never yields [`Attempt::AsyncRequired`].
    pub fn async_attempt<'a>(&'a self, input: &'a Value) -> BoxFuture<'a, Attempt> {
        match &self.plan.strategy {
            Strategy::Literal(literal) => {
                let attempt = literal_attempt(literal, input);
                Box::pin(async move { attempt })
            }
            Strategy::Accelerated(accelerated) => {
                accelerated.attempt_async(self.validator.as_ref(), input)
            }
            Strategy::Generic => generic_attempt_async(self.validator.as_ref(), input),
        }
    }
}

impl fmt::Debug for CompiledMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMatcher")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

fn literal_attempt(literal: &Value, input: &Value) -> Attempt {
    if input == literal {
        Attempt::Matched(input.clone())
    } else {
        Attempt::NoMatch
    }
}

/// Calls `validate` directly; `Pending` means the async path is required.
pub(crate) fn generic_attempt(validator: &dyn Validator, input: &Value) -> Attempt {
    match validator.validate(input) {
        Validated::Ready(Validation::Success(output)) => Attempt::Matched(output),
        Validated::Ready(Validation::Failure(_)) => Attempt::NoMatch,
        Validated::Pending(_) => Attempt::AsyncRequired,
    }
}

pub(crate) fn generic_attempt_async<'a>(
    validator: &'a dyn Validator,
    input: &'a Value,
) -> BoxFuture<'a, Attempt> {
    Box::pin(async move {
        match validator.validate(input).settle().await {
            Validation::Success(output) => Attempt::Matched(output),
            Validation::Failure(_) => Attempt::NoMatch,
        }
    })
}

/// Compiles validators using an ordered list of family adapters.
///
/// Most code uses the process-wide [`Compiler::global`]; a dedicated
/// compiler is useful to register extra adapters.
pub struct Compiler {
    adapters: Vec<Arc<dyn FamilyAdapter>>,
    side_table: SideTable,
}

impl Compiler {
    /// A compiler with the built-in adapters: native, then described.
    pub fn new() -> Self {
        Self::with_adapters(default_adapters())
    }

    /// A compiler consulting `adapters` in order.
    pub fn with_adapters(adapters: Vec<Arc<dyn FamilyAdapter>>) -> Self {
        Self {
            adapters,
            side_table: SideTable::default(),
        }
    }

    /// The process-wide compiler.
    pub fn global() -> Arc<Compiler> {
        static GLOBAL: OnceLock<Arc<Compiler>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Compiler::new())))
    }

    pub fn adapters(&self) -> &[Arc<dyn FamilyAdapter>] {
        &self.adapters
    }

    /// Returns the compiled matcher for `validator`, building it on first use.
    ///
    /// A validator's [`MatcherSlot`] is shared by every compiler, so the
    /// first compiler to see a slotted validator decides its plan.
    pub fn compile(&self, validator: &Arc<dyn Validator>) -> CompiledMatcher {
        let plan = match validator.matcher_slot() {
            Some(slot) => slot.get_or_init(|| self.build_plan(validator.as_ref())),
            None => self
                .side_table
                .get_or_insert(validator, || self.build_plan(validator.as_ref())),
        };
        CompiledMatcher {
            validator: Arc::clone(validator),
            plan,
        }
    }

    fn adapter_for(&self, validator: &dyn Validator) -> Option<&Arc<dyn FamilyAdapter>> {
        self.adapters.iter().find(|adapter| adapter.detect(validator))
    }

    fn build_plan(&self, validator: &dyn Validator) -> MatchPlan {
        let Some(adapter) = self.adapter_for(validator) else {
            tracing::debug!(strategy = "generic", "compiled validator");
            return MatchPlan {
                family: "generic",
                strategy: Strategy::Generic,
            };
        };

        let strategy = if let Some(literal) = adapter.literal(validator) {
            Strategy::Literal(literal)
        } else if let Some(accelerated) = adapter.compile_accelerated(validator) {
            Strategy::Accelerated(accelerated)
        } else {
            Strategy::Generic
        };
        tracing::debug!(
            family = adapter.name(),
            strategy = strategy.name(),
            "compiled validator"
        );
        MatchPlan {
            family: adapter.name(),
            strategy,
        }
    }

    /// Finds the discriminator field declared by `validator`, if its family
    /// exposes one. Names in `priority` win over other qualifying fields.
    pub fn extract_discriminator(
        &self,
        validator: &dyn Validator,
        priority: &[String],
    ) -> Option<Discriminator> {
        self.adapter_for(validator)?
            .extract_discriminator(validator, priority)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles `validator` with the global compiler.
pub fn compile_matcher(validator: &Arc<dyn Validator>) -> CompiledMatcher {
    Compiler::global().compile(validator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::validator::{async_validator_fn, validator_fn};
    use crate::Issues;
    use serde_json::json;

    fn shared(validator: impl Validator + 'static) -> Arc<dyn Validator> {
        Arc::new(validator)
    }

    #[test]
    fn test_literal_strategy() {
        let compiler = Compiler::new();
        let matcher = compiler.compile(&shared(Schema::literal(2)));
        assert_eq!(matcher.strategy(), "literal");
        assert_eq!(matcher.sync_attempt(&json!(2)), Attempt::Matched(json!(2)));
        assert_eq!(matcher.sync_attempt(&json!(2.0)), Attempt::NoMatch);
        assert_eq!(matcher.sync_attempt(&json!("2")), Attempt::NoMatch);
    }

    #[test]
    fn test_native_object_is_accelerated() {
        let compiler = Compiler::new();
        let schema = Schema::object().field("n", Schema::integer()).build();
        let matcher = compiler.compile(&shared(schema));
        assert_eq!(matcher.family(), "native");
        assert_eq!(matcher.strategy(), "accelerated");
        assert_eq!(
            matcher.sync_attempt(&json!({"n": 1})),
            Attempt::Matched(json!({"n": 1}))
        );
        assert_eq!(matcher.sync_attempt(&json!({"n": "1"})), Attempt::NoMatch);
    }

    #[test]
    fn test_unknown_validator_is_generic() {
        let compiler = Compiler::new();
        let matcher = compiler.compile(&shared(validator_fn(|v| {
            if v.is_boolean() {
                Validation::Success(json!("bool"))
            } else {
                Validation::Failure(Issues::message("expected boolean"))
            }
        })));
        assert_eq!(matcher.family(), "generic");
        assert_eq!(matcher.sync_attempt(&json!(true)), Attempt::Matched(json!("bool")));
        assert_eq!(matcher.sync_attempt(&json!(1)), Attempt::NoMatch);
    }

    #[test]
    fn test_pending_is_async_required_on_sync_path() {
        let compiler = Compiler::new();
        let matcher = compiler.compile(&shared(async_validator_fn(|v| {
            Box::pin(async move { Validation::Success(v) })
        })));
        assert_eq!(matcher.sync_attempt(&json!(1)), Attempt::AsyncRequired);
    }

    #[tokio::test]
    async fn test_async_attempt_awaits() {
        let compiler = Compiler::new();
        let matcher = compiler.compile(&shared(async_validator_fn(|v| {
            Box::pin(async move {
                if v == json!(1) {
                    Validation::Success(json!("one"))
                } else {
                    Validation::Failure(Issues::message("not one"))
                }
            })
        })));
        assert_eq!(matcher.async_attempt(&json!(1)).await, Attempt::Matched(json!("one")));
        assert_eq!(matcher.async_attempt(&json!(2)).await, Attempt::NoMatch);
    }

    #[test]
    fn test_compile_is_memoized_per_instance() {
        let compiler = Compiler::new();
        let schema = shared(Schema::string());
        let first = compiler.compile(&schema);
        let second = compiler.compile(&schema);
        assert!(first.same_plan(&second));

        let twin = compiler.compile(&shared(Schema::string()));
        assert!(!first.same_plan(&twin));
    }

    #[test]
    fn test_slotted_validator_skips_side_table() {
        let compiler = Compiler::new();
        compiler.compile(&shared(Schema::string()));
        assert_eq!(compiler.side_table.len(), 0);

        let plain = shared(validator_fn(|v| Validation::Success(v.clone())));
        compiler.compile(&plain);
        assert_eq!(compiler.side_table.len(), 1);
    }
}
