//! # Schematch
//!
//! Pattern matching over JSON values, dispatched by schema validators.
//!
//! ## Overview
//!
//! A match expression is an ordered list of clauses. Each clause pairs one
//! or more validators (plus an optional guard) with a handler, or pairs a
//! bare predicate with a handler. The first clause whose validator accepts
//! the input runs its handler with the validated (possibly transformed)
//! value and the original input.
//!
//! Matching is built to stay fast on the success path:
//!
//! - validators are compiled once per instance into matchers that skip
//!   issue collection, using cheap prechecks derived from the schema tree
//! - clauses discriminated by a shared literal field (`type`, `kind`, ...)
//!   are routed through a dispatch table instead of a linear scan
//! - the no-match diagnostic is only built on the failure path, and then
//!   re-validates only the clauses the input could have reached
//!
//! ## Core Types
//!
//! - [`Validator`]: the contract every schema implements, sync or async
//! - [`Schema`]: the native, introspectable schema family
//! - [`Matcher`]: a reusable, persistent match expression
//! - [`MatchError`]: the structured no-match diagnostic
//! - [`MatchFault`]: usage errors and terminal no-matches
//!
//! ## Example
//!
//! ```rust
//! use schematch::{Handler, Matcher, Schema};
//! use serde_json::json;
//!
//! let describe = Matcher::new()
//!     .case(
//!         Schema::object()
//!             .field("type", Schema::literal("ok"))
//!             .field("value", Schema::number()),
//!         Handler::new(|value, _| format!("ok: {}", value["value"])),
//!     )
//!     .case(
//!         Schema::object()
//!             .field("type", Schema::literal("err"))
//!             .field("message", Schema::string()),
//!         Handler::new(|value, _| format!("err: {}", value["message"])),
//!     );
//!
//! assert_eq!(describe.run(&json!({"type": "ok", "value": 1})).unwrap(), "ok: 1");
//!
//! let err = describe.try_run(&json!({"type": "nope"})).unwrap().unwrap_err();
//! let info = err.discriminator.unwrap();
//! assert_eq!(info.key, "type");
//! assert!(!info.matched);
//! ```

pub mod clause;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod discriminant;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod family;
pub mod matcher;
pub mod path;
pub mod schema;
pub mod validator;

pub use clause::{Clause, ClauseList, Guard, Handler, Predicate};
pub use compile::{compile_matcher, Accelerated, Attempt, CompiledMatcher, Compiler, MatcherSlot};
pub use config::{MatchConfig, DEFAULT_DISCRIMINATOR_PRIORITY};
pub use diagnostics::{build_diagnostics, build_diagnostics_async};
pub use discriminant::{Discriminant, Discriminator};
pub use dispatch::{build_dispatch_table, DispatchTable, Lookup, Route};
pub use error::{AsyncSource, CaseIssue, DiscriminatorInfo, Issue, Issues, MatchError, MatchFault};
pub use execute::{execute_async, execute_sync, Execution};
pub use family::{DescribedFamily, FamilyAdapter, NativeFamily};
pub use matcher::{LazyDiagnostics, Matcher};
pub use path::{IssuePath, PathSegment};
pub use schema::{ObjectSchema, Schema, Shape};
pub use validator::{
    async_validator_fn, validator_fn, AsyncFnValidator, BoxFuture, FnValidator, IntoValidator,
    Outcome, Validated, Validator,
};
