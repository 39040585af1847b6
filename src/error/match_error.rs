//! Match failures and the no-match diagnostic.

use std::fmt::{self, Display};
use std::sync::Arc;

use serde_json::Value;

use crate::error::Issue;
use crate::validator::Validator;

/// Which part of a clause turned out to be asynchronous during a sync match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncSource {
    /// The validator at this position in the clause's schema list.
    Validator(usize),
    Guard,
    Predicate,
    Handler,
}

impl Display for AsyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncSource::Validator(idx) => write!(f, "validator #{}", idx),
            AsyncSource::Guard => write!(f, "guard"),
            AsyncSource::Predicate => write!(f, "predicate"),
            AsyncSource::Handler => write!(f, "handler"),
        }
    }
}

/// Errors surfaced by the matching engine.
#[derive(Debug, thiserror::Error)]
pub enum MatchFault {
    /// A synchronous match hit an asynchronous validator, guard, predicate or handler.
    #[error("case {case}: {origin} is asynchronous; use the async match API instead")]
    AsyncRequired { case: usize, origin: AsyncSource },

    /// A clause was built without the parts it needs.
    #[error("malformed case {case}: {reason}")]
    Malformed { case: usize, reason: String },

    /// No clause accepted the input.
    #[error("{0}")]
    Unmatched(Box<MatchError>),
}

impl MatchFault {
    /// Returns the diagnostic when this fault is a no-match.
    pub fn as_unmatched(&self) -> Option<&MatchError> {
        match self {
            MatchFault::Unmatched(err) => Some(err),
            _ => None,
        }
    }
}

/// An issue tagged with the clause and schema that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseIssue {
    /// Index of the clause in declaration order.
    pub case: usize,
    /// Index of the schema within the clause.
    pub schema: usize,
    pub issue: Issue,
}

/// What the dispatch table knew about the input's discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorInfo {
    pub key: String,
    /// The input's value for `key`, `None` when the key was missing.
    pub value: Option<Value>,
    /// Every discriminator value some clause accepts, in first-seen order.
    pub expected: Vec<Value>,
    /// `true` when `value` routed to at least one clause that then failed.
    pub matched: bool,
}

/// Diagnostic produced when no clause accepts an input.
///
/// Built lazily on the failure path only. `message` is a multi-line
/// human-readable rendering of the remaining fields.
#[derive(Clone)]
pub struct MatchError {
    pub message: String,
    pub input: Value,
    pub issues: Vec<CaseIssue>,
    /// Validators that were re-run to produce `issues`.
    pub schemas: Vec<Arc<dyn Validator>>,
    pub discriminator: Option<DiscriminatorInfo>,
}

impl MatchError {
    /// Issues reported for one clause, in schema order.
    pub fn issues_for_case(&self, case: usize) -> Vec<&CaseIssue> {
        self.issues.iter().filter(|i| i.case == case).collect()
    }

    /// Distinct clause indices that contributed issues, ascending.
    pub fn cases(&self) -> Vec<usize> {
        let mut cases: Vec<usize> = self.issues.iter().map(|i| i.case).collect();
        cases.dedup();
        cases
    }
}

impl fmt::Debug for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchError")
            .field("message", &self.message)
            .field("input", &self.input)
            .field("issues", &self.issues)
            .field("schemas", &self.schemas.len())
            .field("discriminator", &self.discriminator)
            .finish()
    }
}

impl Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MatchError {}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<MatchFault>();
    assert_sync::<MatchFault>();
};
