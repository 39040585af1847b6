//! Match clauses and the persistent clause list.
//!
//! A [`Clause`] is either a list of schemas with an optional guard, or a
//! bare predicate; both carry a handler. Guards, predicates and handlers
//! come in synchronous and asynchronous forms. Asynchronous ones only run
//! on the async match path.
//!
//! [`ClauseList`] is append-only and persistent: pushing returns a new list
//! sharing the old one's nodes, so earlier lists stay valid and can be held
//! by other matchers concurrently.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::error::MatchFault;
use crate::validator::{BoxFuture, Validator};

type SyncGuard = dyn Fn(&Value, &Value) -> bool + Send + Sync;
type AsyncGuard = dyn Fn(Value, Value) -> BoxFuture<'static, bool> + Send + Sync;
type SyncHandler<R> = dyn Fn(Value, &Value) -> R + Send + Sync;
type AsyncHandler<R> = dyn Fn(Value, Value) -> BoxFuture<'static, R> + Send + Sync;

/// A secondary check run with `(validated, input)` after a schema matched.
///
/// A failing guard moves on to the next schema of the same clause.
#[derive(Clone)]
pub enum Guard {
    Sync(Arc<SyncGuard>),
    Async(Arc<AsyncGuard>),
}

impl Guard {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Guard::Sync(Arc::new(check))
    }

    pub fn new_async<F>(check: F) -> Self
    where
        F: Fn(Value, Value) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Guard::Async(Arc::new(check))
    }
}

/// The condition of a `when` clause, evaluated on the raw input.
#[derive(Clone)]
pub enum Predicate {
    Sync(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
    Async(Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>),
}

impl Predicate {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Predicate::Sync(Arc::new(check))
    }

    pub fn new_async<F>(check: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Predicate::Async(Arc::new(check))
    }
}

/// Produces the match result from `(validated, input)`.
pub enum Handler<R> {
    Sync(Arc<SyncHandler<R>>),
    Async(Arc<AsyncHandler<R>>),
}

impl<R> Handler<R> {
    pub fn new<F>(handle: F) -> Self
    where
        F: Fn(Value, &Value) -> R + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(handle))
    }

    pub fn new_async<F>(handle: F) -> Self
    where
        F: Fn(Value, Value) -> BoxFuture<'static, R> + Send + Sync + 'static,
    {
        Handler::Async(Arc::new(handle))
    }

    /// A handler returning a clone of `result`.
    pub fn constant(result: R) -> Self
    where
        R: Clone + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(move |_, _| result.clone()))
    }
}

impl<R> Clone for Handler<R> {
    fn clone(&self) -> Self {
        match self {
            Handler::Sync(f) => Handler::Sync(Arc::clone(f)),
            Handler::Async(f) => Handler::Async(Arc::clone(f)),
        }
    }
}

/// One branch of a match expression.
pub enum Clause<R> {
    Schemas {
        schemas: Vec<Arc<dyn Validator>>,
        guard: Option<Guard>,
        handler: Handler<R>,
    },
    When {
        predicate: Predicate,
        handler: Handler<R>,
    },
}

impl<R> Clause<R> {
    pub fn schemas(
        schemas: Vec<Arc<dyn Validator>>,
        guard: Option<Guard>,
        handler: Handler<R>,
    ) -> Self {
        Clause::Schemas {
            schemas,
            guard,
            handler,
        }
    }

    pub fn when(predicate: Predicate, handler: Handler<R>) -> Self {
        Clause::When { predicate, handler }
    }

    /// The clause's validators; empty for `when` clauses.
    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        match self {
            Clause::Schemas { schemas, .. } => schemas,
            Clause::When { .. } => &[],
        }
    }

    fn check(&self, case: usize) -> Result<(), MatchFault> {
        match self {
            Clause::Schemas { schemas, .. } if schemas.is_empty() => Err(MatchFault::Malformed {
                case,
                reason: "a schema clause needs at least one schema".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl<R> fmt::Debug for Clause<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Schemas { schemas, guard, .. } => f
                .debug_struct("Schemas")
                .field("schemas", &schemas.len())
                .field("guarded", &guard.is_some())
                .finish_non_exhaustive(),
            Clause::When { .. } => f.debug_struct("When").finish_non_exhaustive(),
        }
    }
}

struct Node<R> {
    clause: Arc<Clause<R>>,
    prev: Option<Arc<Node<R>>>,
    len: usize,
    materialized: OnceLock<Arc<[Arc<Clause<R>>]>>,
}

/// A persistent, append-only list of clauses.
pub struct ClauseList<R> {
    head: Option<Arc<Node<R>>>,
}

impl<R> ClauseList<R> {
    pub fn new() -> Self {
        Self { head: None }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns a new list with `clause` appended; `self` is unchanged.
    ///
    /// A schema clause without schemas is rejected.
    pub fn push(&self, clause: Clause<R>) -> Result<Self, MatchFault> {
        clause.check(self.len())?;
        Ok(self.append(clause))
    }

    /// `push` for clauses already known to be well formed.
    pub(crate) fn append(&self, clause: Clause<R>) -> Self {
        Self {
            head: Some(Arc::new(Node {
                clause: Arc::new(clause),
                prev: self.head.clone(),
                len: self.len() + 1,
                materialized: OnceLock::new(),
            })),
        }
    }

    /// The clauses in declaration order, materialized once per list.
    pub fn clauses(&self) -> Arc<[Arc<Clause<R>>]> {
        let Some(head) = &self.head else {
            return Arc::from(Vec::new());
        };
        Arc::clone(head.materialized.get_or_init(|| {
            let mut clauses = Vec::with_capacity(head.len);
            let mut cursor = Some(head);
            while let Some(node) = cursor {
                clauses.push(Arc::clone(&node.clause));
                cursor = node.prev.as_ref();
            }
            clauses.reverse();
            clauses.into()
        }))
    }

    /// Returns true if both lists are the same list.
    pub fn ptr_eq(&self, other: &ClauseList<R>) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<R> Clone for ClauseList<R> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<R> Default for ClauseList<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ClauseList<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clauses().iter()).finish()
    }
}
