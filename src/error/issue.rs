//! Validation issues reported by validators.
//!
//! An [`Issue`] is a single reason a value was rejected; [`Issues`] is the
//! non-empty, ordered collection carried by a failed validation.

use std::fmt::{self, Display};

use stillwater::prelude::*;

use crate::path::IssuePath;

/// A single reason a validator rejected a value.
///
/// # Example
///
/// ```rust
/// use schematch::{Issue, IssuePath};
///
/// let issue = Issue::new("expected number")
///     .at(IssuePath::root().key("value"))
///     .with_code("invalid_type");
///
/// assert_eq!(issue.to_string(), "value: expected number");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    /// Where in the value the issue occurred. Root when the validator gave no path.
    pub path: IssuePath,
    /// Human-readable description.
    pub message: String,
    /// Machine-readable code (e.g. `invalid_type`, `unknown_discriminator`).
    pub code: String,
}

impl Issue {
    /// Creates an issue at the root path with the default `invalid` code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: IssuePath::root(),
            message: message.into(),
            code: "invalid".to_string(),
        }
    }

    /// Sets the path and returns self for chaining.
    pub fn at(mut self, path: IssuePath) -> Self {
        self.path = path;
        self
    }

    /// Sets the code and returns self for chaining.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for Issue {}

/// A non-empty, ordered collection of issues.
///
/// `Issues` implements `Semigroup`, so issue sets from several fields or
/// options can be merged:
///
/// ```rust
/// use schematch::{Issue, Issues};
/// use stillwater::prelude::*;
///
/// let merged = Issues::single(Issue::new("a")).combine(Issues::single(Issue::new("b")));
/// assert_eq!(merged.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Issues(NonEmptyVec<Issue>);

impl Issues {
    pub fn single(issue: Issue) -> Self {
        Self(NonEmptyVec::singleton(issue))
    }

    /// Builds a collection from a vec, returning `None` when it is empty.
    pub fn from_vec(issues: Vec<Issue>) -> Option<Self> {
        let mut iter = issues.into_iter();
        let head = NonEmptyVec::singleton(iter.next()?);
        Some(Self(iter.fold(head, |acc, issue| {
            acc.combine(NonEmptyVec::singleton(issue))
        })))
    }

    /// Shorthand for a single root-level issue with the given message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::single(Issue::new(message))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }

    pub fn first(&self) -> &Issue {
        self.0.head()
    }

    /// Returns all issues with the given code.
    pub fn with_code(&self, code: &str) -> Vec<&Issue> {
        self.0.iter().filter(|i| i.code == code).collect()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.0.into_vec()
    }
}

impl Semigroup for Issues {
    fn combine(self, other: Self) -> Self {
        Issues(self.0.combine(other.0))
    }
}

impl Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for Issues {}

impl IntoIterator for Issues {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Issues>();
    assert_sync::<Issues>();
};
