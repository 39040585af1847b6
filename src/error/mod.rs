//! Issue and failure types.
//!
//! Validators report [`Issues`]; the matching engine reports [`MatchFault`]
//! for usage errors and wraps total non-matches in a [`MatchError`]
//! diagnostic.

mod issue;
mod match_error;

pub use issue::{Issue, Issues};
pub use match_error::{AsyncSource, CaseIssue, DiscriminatorInfo, MatchError, MatchFault};
