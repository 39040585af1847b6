//! The reusable matcher.
//!
//! A [`Matcher`] owns a persistent clause list, its configuration and the
//! compiler used for its validators. Adding a clause returns a new matcher;
//! the old one stays valid, so a partially built matcher can be extended in
//! several directions and shared across threads.
//!
//! # Example
//!
//! ```rust
//! use schematch::{Guard, Handler, Matcher, Schema};
//! use serde_json::json;
//!
//! let size = Matcher::new()
//!     .case_guarded(
//!         Schema::number(),
//!         Guard::new(|n, _| n.as_f64().is_some_and(|n| n > 10.0)),
//!         Handler::constant("big"),
//!     )
//!     .case(Schema::number(), Handler::constant("small"));
//!
//! assert_eq!(size.run(&json!(12)).unwrap(), "big");
//! assert_eq!(size.run(&json!(4)).unwrap(), "small");
//! assert!(size.run(&json!("x")).is_err());
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::clause::{Clause, ClauseList, Guard, Handler, Predicate};
use crate::compile::Compiler;
use crate::config::MatchConfig;
use crate::diagnostics::{build_diagnostics, build_diagnostics_async};
use crate::dispatch::{build_dispatch_table, DispatchTable};
use crate::error::{MatchError, MatchFault};
use crate::execute::{execute_async, execute_sync, Execution};
use crate::validator::{IntoValidator, Validator};

type TableCache = Arc<OnceLock<Option<Arc<DispatchTable>>>>;

/// An ordered set of clauses evaluated with first-match-wins semantics.
pub struct Matcher<R> {
    clauses: ClauseList<R>,
    config: Arc<MatchConfig>,
    compiler: Arc<Compiler>,
    table: TableCache,
}

impl<R> Matcher<R> {
    /// An empty matcher using the global compiler and default config.
    pub fn new() -> Self {
        Self::from_parts(
            ClauseList::new(),
            Arc::new(MatchConfig::default()),
            Compiler::global(),
        )
    }

    fn from_parts(clauses: ClauseList<R>, config: Arc<MatchConfig>, compiler: Arc<Compiler>) -> Self {
        Self {
            clauses,
            config,
            compiler,
            table: Arc::new(OnceLock::new()),
        }
    }

    fn with_clauses(&self, clauses: ClauseList<R>) -> Self {
        Self::from_parts(clauses, Arc::clone(&self.config), Arc::clone(&self.compiler))
    }

    pub fn with_config(&self, config: MatchConfig) -> Self {
        Self::from_parts(self.clauses.clone(), Arc::new(config), Arc::clone(&self.compiler))
    }

    pub fn with_compiler(&self, compiler: Arc<Compiler>) -> Self {
        Self::from_parts(self.clauses.clone(), Arc::clone(&self.config), compiler)
    }

    /// Adds a clause matching `schema`.
    pub fn case(&self, schema: impl IntoValidator, handler: Handler<R>) -> Self {
        self.with_clauses(self.clauses.append(Clause::schemas(
            vec![schema.into_validator()],
            None,
            handler,
        )))
    }

    /// Adds a clause matching `schema` whose validated value also passes
    /// `guard`.
    pub fn case_guarded(&self, schema: impl IntoValidator, guard: Guard, handler: Handler<R>) -> Self {
        self.with_clauses(self.clauses.append(Clause::schemas(
            vec![schema.into_validator()],
            Some(guard),
            handler,
        )))
    }

    /// Adds a clause matching any of `schemas`, tried in order.
    ///
    /// Fails with [`MatchFault::Malformed`] when `schemas` is empty.
    pub fn case_any(
        &self,
        schemas: Vec<Arc<dyn Validator>>,
        guard: Option<Guard>,
        handler: Handler<R>,
    ) -> Result<Self, MatchFault> {
        let clauses = self.clauses.push(Clause::schemas(schemas, guard, handler))?;
        Ok(self.with_clauses(clauses))
    }

    /// Adds a clause taken when `predicate` holds for the raw input.
    pub fn when(&self, predicate: Predicate, handler: Handler<R>) -> Self {
        self.with_clauses(self.clauses.append(Clause::when(predicate, handler)))
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &ClauseList<R> {
        &self.clauses
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// The dispatch table for this matcher's clauses, built on first use.
    pub fn dispatch_table(&self) -> Option<Arc<DispatchTable>> {
        self.table
            .get_or_init(|| {
                build_dispatch_table(&self.clauses.clauses(), &self.compiler, &self.config)
                    .map(Arc::new)
            })
            .clone()
    }

    /// Runs the clauses without building a diagnostic on failure.
    pub fn execute(&self, input: &Value) -> Result<Execution<R>, MatchFault> {
        let table = self.dispatch_table();
        execute_sync(&self.clauses.clauses(), table.as_deref(), input, &self.compiler)
    }

    /// Runs the clauses; no match is an [`MatchFault::Unmatched`] error.
    pub fn run(&self, input: &Value) -> Result<R, MatchFault> {
        match self.try_run(input)? {
            Ok(output) => Ok(output),
            Err(unmatched) => Err(MatchFault::Unmatched(Box::new(unmatched))),
        }
    }

    /// Runs the clauses, returning the diagnostic as a value on no match.
    ///
    /// The outer error is reserved for usage faults.
    pub fn try_run(&self, input: &Value) -> Result<Result<R, MatchError>, MatchFault> {
        match self.execute(input)? {
            Execution::Matched { output, .. } => Ok(Ok(output)),
            Execution::Unmatched => Ok(Err(self.diagnose(input))),
        }
    }

    /// Runs the clauses, delegating a no match to `fallback`.
    ///
    /// The diagnostic is only built if `fallback` asks for it.
    ///
    /// ```rust
    /// use schematch::{Handler, Matcher, Schema};
    /// use serde_json::json;
    ///
    /// let m = Matcher::new().case(Schema::string(), Handler::constant(0usize));
    /// let n = m.run_or_else(&json!(1), |_, diagnostics| diagnostics.get().issues.len()).unwrap();
    /// assert_eq!(n, 1);
    /// ```
    pub fn run_or_else<F>(&self, input: &Value, fallback: F) -> Result<R, MatchFault>
    where
        F: FnOnce(&Value, &LazyDiagnostics<'_, R>) -> R,
    {
        match self.execute(input)? {
            Execution::Matched { output, .. } => Ok(output),
            Execution::Unmatched => {
                let diagnostics = LazyDiagnostics {
                    matcher: self,
                    input,
                    error: OnceLock::new(),
                };
                Ok(fallback(input, &diagnostics))
            }
        }
    }

    /// Builds the no-match diagnostic for `input`.
    pub fn diagnose(&self, input: &Value) -> MatchError {
        let table = self.dispatch_table();
        build_diagnostics(input, &self.clauses.clauses(), table.as_deref(), &self.config)
    }

    pub async fn execute_async(&self, input: &Value) -> Result<Execution<R>, MatchFault> {
        let table = self.dispatch_table();
        let clauses = self.clauses.clauses();
        execute_async(&clauses, table.as_deref(), input, &self.compiler).await
    }

    /// Async form of [`run`](Matcher::run): validators, guards, predicates
    /// and handlers may all suspend.
    pub async fn run_async(&self, input: &Value) -> Result<R, MatchFault> {
        match self.try_run_async(input).await? {
            Ok(output) => Ok(output),
            Err(unmatched) => Err(MatchFault::Unmatched(Box::new(unmatched))),
        }
    }

    pub async fn try_run_async(&self, input: &Value) -> Result<Result<R, MatchError>, MatchFault> {
        match self.execute_async(input).await? {
            Execution::Matched { output, .. } => Ok(Ok(output)),
            Execution::Unmatched => Ok(Err(self.diagnose_async(input).await)),
        }
    }

    pub async fn diagnose_async(&self, input: &Value) -> MatchError {
        let table = self.dispatch_table();
        let clauses = self.clauses.clauses();
        build_diagnostics_async(input, &clauses, table.as_deref(), &self.config).await
    }
}

impl<R> Default for Matcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Matcher<R> {
    fn clone(&self) -> Self {
        Self {
            clauses: self.clauses.clone(),
            config: Arc::clone(&self.config),
            compiler: Arc::clone(&self.compiler),
            table: Arc::clone(&self.table),
        }
    }
}

impl<R> fmt::Debug for Matcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("clauses", &self.clauses.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The no-match diagnostic, built on first access and then memoized.
pub struct LazyDiagnostics<'m, R> {
    matcher: &'m Matcher<R>,
    input: &'m Value,
    error: OnceLock<MatchError>,
}

impl<R> LazyDiagnostics<'_, R> {
    pub fn get(&self) -> &MatchError {
        self.error.get_or_init(|| self.matcher.diagnose(self.input))
    }

    pub fn is_built(&self) -> bool {
        self.error.get().is_some()
    }
}
