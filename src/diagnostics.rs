//! Building the no-match diagnostic.
//!
//! Runs only on the failure path. The work done depends on what the
//! dispatch table knows about the input:
//!
//! - unknown or missing discriminator value: no validator is re-run; the
//!   error names the key, the value and the expected values
//! - known value: only the clauses registered under it are re-validated
//! - no table, or a non-object input: every schema of every clause is
//!   re-validated, in clause-then-schema order
//!
//! Re-validation never fails the diagnostic itself. Asynchronous
//! validators are skipped on the sync path, and a validator that panics
//! is left out of the report.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rayon::prelude::*;
use serde_json::Value;
use stillwater::Validation;

use crate::clause::Clause;
use crate::config::MatchConfig;
use crate::dispatch::{DispatchTable, Lookup};
use crate::error::{CaseIssue, DiscriminatorInfo, Issue, MatchError};
use crate::validator::{Outcome, Validated, Validator};

/// Nesting depth beyond which the input is not rendered.
const MAX_PREVIEW_DEPTH: usize = 128;

const UNPRINTABLE: &str = "<unprintable input>";

/// A validator to re-run, with its position in the clause list.
struct Target {
    case: usize,
    schema: usize,
    validator: Arc<dyn Validator>,
    guarded: bool,
}

enum Plan {
    /// The discriminator rules out every keyed clause.
    Unknown(DiscriminatorInfo),
    Revalidate {
        targets: Vec<Target>,
        discriminator: Option<DiscriminatorInfo>,
    },
}

fn plan<R>(input: &Value, clauses: &[Arc<Clause<R>>], table: Option<&DispatchTable>) -> Plan {
    let lookup = table.map(|table| (table, table.lookup(input)));
    let (cases, discriminator): (Vec<usize>, _) = match lookup {
        Some((table, Lookup::Miss { value })) => {
            return Plan::Unknown(DiscriminatorInfo {
                key: table.key().to_string(),
                value: value.cloned(),
                expected: table.expected(),
                matched: false,
            });
        }
        Some((table, Lookup::Hit { value, clauses: registered })) => (
            registered.to_vec(),
            Some(DiscriminatorInfo {
                key: table.key().to_string(),
                value: Some(value.clone()),
                expected: table.expected(),
                matched: true,
            }),
        ),
        Some((_, Lookup::NotKeyed)) | None => ((0..clauses.len()).collect(), None),
    };

    let targets = cases
        .into_iter()
        .filter_map(|case| clauses.get(case).map(|clause| (case, clause)))
        .flat_map(|(case, clause)| {
            let guarded = matches!(clause.as_ref(), Clause::Schemas { guard: Some(_), .. });
            clause
                .validators()
                .iter()
                .enumerate()
                .map(move |(schema, validator)| Target {
                    case,
                    schema,
                    validator: Arc::clone(validator),
                    guarded,
                })
                .collect::<Vec<_>>()
        })
        .collect();
    Plan::Revalidate {
        targets,
        discriminator,
    }
}

fn omit_panicked(target: &Target) {
    tracing::warn!(
        case = target.case,
        schema = target.schema,
        "validator panicked while building diagnostics; omitting it"
    );
}

/// Runs one validator synchronously; `None` when it is asynchronous or
/// panicked.
fn revalidate(target: &Target, input: &Value) -> Option<Outcome> {
    match catch_unwind(AssertUnwindSafe(|| target.validator.validate(input).into_ready())) {
        Ok(outcome) => outcome,
        Err(_) => {
            omit_panicked(target);
            None
        }
    }
}

/// Turns re-validation outcomes into case-tagged issues.
fn collect_issues(targets: &[Target], outcomes: Vec<Option<Outcome>>) -> Vec<CaseIssue> {
    let mut issues = Vec::new();
    for (target, outcome) in targets.iter().zip(outcomes) {
        match outcome {
            Some(Validation::Failure(found)) => {
                issues.extend(found.into_iter().map(|issue| CaseIssue {
                    case: target.case,
                    schema: target.schema,
                    issue,
                }));
            }
            Some(Validation::Success(_)) if target.guarded => issues.push(CaseIssue {
                case: target.case,
                schema: target.schema,
                issue: Issue::new("value matched but the guard rejected it")
                    .with_code("guard_rejected"),
            }),
            Some(Validation::Success(_)) | None => {}
        }
    }
    issues
}

/// Builds the diagnostic for an input no clause accepted.
///
/// `table` must have been built from the same clauses.
pub fn build_diagnostics<R>(
    input: &Value,
    clauses: &[Arc<Clause<R>>],
    table: Option<&DispatchTable>,
    config: &MatchConfig,
) -> MatchError {
    match plan(input, clauses, table) {
        Plan::Unknown(info) => finish(input, Vec::new(), Vec::new(), Some(info), config),
        Plan::Revalidate {
            targets,
            discriminator,
        } => {
            let outcomes: Vec<Option<Outcome>> = if config.parallel_diagnostics {
                targets.par_iter().map(|t| revalidate(t, input)).collect()
            } else {
                targets.iter().map(|t| revalidate(t, input)).collect()
            };
            let issues = collect_issues(&targets, outcomes);
            finish(input, issues, targets, discriminator, config)
        }
    }
}

/// Like [`build_diagnostics`], awaiting asynchronous validators instead of
/// skipping them. Validators are re-run one at a time, in order.
pub async fn build_diagnostics_async<R>(
    input: &Value,
    clauses: &[Arc<Clause<R>>],
    table: Option<&DispatchTable>,
    config: &MatchConfig,
) -> MatchError {
    let (targets, discriminator) = match plan(input, clauses, table) {
        Plan::Unknown(info) => return finish(input, Vec::new(), Vec::new(), Some(info), config),
        Plan::Revalidate {
            targets,
            discriminator,
        } => (targets, discriminator),
    };

    let mut outcomes = Vec::with_capacity(targets.len());
    for target in &targets {
        let outcome = match catch_unwind(AssertUnwindSafe(|| target.validator.validate(input))) {
            Ok(Validated::Ready(outcome)) => Some(outcome),
            Ok(Validated::Pending(pending)) => match CatchUnwind(pending).await {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    omit_panicked(target);
                    None
                }
            },
            Err(_) => {
                omit_panicked(target);
                None
            }
        };
        outcomes.push(outcome);
    }
    let issues = collect_issues(&targets, outcomes);
    finish(input, issues, targets, discriminator, config)
}

/// Polls a future, turning a panic into an error.
struct CatchUnwind<F>(F);

impl<F: Future + Unpin> Future for CatchUnwind<F> {
    type Output = std::thread::Result<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = &mut self.0;
        match catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Err(panic) => Poll::Ready(Err(panic)),
        }
    }
}

fn finish(
    input: &Value,
    issues: Vec<CaseIssue>,
    targets: Vec<Target>,
    discriminator: Option<DiscriminatorInfo>,
    config: &MatchConfig,
) -> MatchError {
    let message = render(input, &issues, discriminator.as_ref(), config.preview_limit);
    MatchError {
        message,
        input: input.clone(),
        issues,
        schemas: targets.into_iter().map(|t| t.validator).collect(),
        discriminator,
    }
}

fn render(
    input: &Value,
    issues: &[CaseIssue],
    discriminator: Option<&DiscriminatorInfo>,
    preview_limit: usize,
) -> String {
    let mut message = format!("no schema matches input {}", preview(input, preview_limit));

    if let Some(info) = discriminator {
        let expected = info
            .expected
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let line = match (&info.value, info.matched) {
            (None, _) => format!(
                "discriminator '{}' is missing; expected one of {}",
                info.key, expected
            ),
            (Some(value), false) => format!(
                "discriminator '{}' has unknown value {}; expected one of {}",
                info.key, value, expected
            ),
            (Some(value), true) => format!(
                "discriminator '{}' = {} selected a case, but validation failed",
                info.key, value
            ),
        };
        message.push('\n');
        message.push_str(&line);
    }

    for case_issue in issues {
        message.push_str(&format!(
            "\n  case {} schema {}: {}",
            case_issue.case, case_issue.schema, case_issue.issue
        ));
    }
    message
}

/// Renders `input` for messages, truncated to `limit` characters.
///
/// Never fails: inputs that cannot be rendered become a placeholder.
pub(crate) fn preview(input: &Value, limit: usize) -> String {
    if depth_exceeds(input, MAX_PREVIEW_DEPTH) {
        return UNPRINTABLE.to_string();
    }
    let text = serde_json::to_string(input).unwrap_or_else(|_| UNPRINTABLE.to_string());
    if text.chars().count() <= limit {
        return text;
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

fn depth_exceeds(value: &Value, max: usize) -> bool {
    let mut stack = vec![(value, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        if depth > max {
            return true;
        }
        match value {
            Value::Array(items) => stack.extend(items.iter().map(|v| (v, depth + 1))),
            Value::Object(map) => stack.extend(map.values().map(|v| (v, depth + 1))),
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{Guard, Handler};
    use crate::compile::Compiler;
    use crate::dispatch::build_dispatch_table;
    use crate::schema::Schema;
    use crate::validator::{async_validator_fn, validator_fn};
    use crate::Issues;
    use serde_json::json;

    fn clause(schemas: Vec<Arc<dyn Validator>>) -> Arc<Clause<()>> {
        Arc::new(Clause::schemas(schemas, None, Handler::constant(())))
    }

    fn shared(schema: Schema) -> Arc<dyn Validator> {
        Arc::new(schema)
    }

    #[test]
    fn test_linear_reports_every_schema_in_order() {
        let clauses = vec![
            clause(vec![shared(Schema::string()), shared(Schema::boolean())]),
            clause(vec![shared(Schema::null())]),
        ];
        let err = build_diagnostics(&json!(1), &clauses, None, &MatchConfig::default());
        let order: Vec<(usize, usize)> = err.issues.iter().map(|i| (i.case, i.schema)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0)]);
        assert_eq!(err.schemas.len(), 3);
        assert!(err.discriminator.is_none());
        assert!(err.message.starts_with("no schema matches input 1"));
    }

    #[test]
    fn test_guard_rejection_is_reported() {
        let clauses: Vec<Arc<Clause<()>>> = vec![Arc::new(Clause::schemas(
            vec![shared(Schema::number())],
            Some(Guard::new(|_, _| false)),
            Handler::constant(()),
        ))];
        let err = build_diagnostics(&json!(1), &clauses, None, &MatchConfig::default());
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].issue.code, "guard_rejected");
    }

    #[test]
    fn test_async_validators_are_skipped_on_sync_path() {
        let pending: Arc<dyn Validator> = Arc::new(async_validator_fn(|_| {
            Box::pin(async { Validation::Failure(Issues::message("async says no")) })
        }));
        let clauses = vec![clause(vec![pending, shared(Schema::string())])];
        let err = build_diagnostics(&json!(1), &clauses, None, &MatchConfig::default());
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].schema, 1);
    }

    #[tokio::test]
    async fn test_async_validators_are_awaited_on_async_path() {
        let pending: Arc<dyn Validator> = Arc::new(async_validator_fn(|_| {
            Box::pin(async { Validation::Failure(Issues::message("async says no")) })
        }));
        let clauses = vec![clause(vec![pending])];
        let err = build_diagnostics_async(&json!(1), &clauses, None, &MatchConfig::default()).await;
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].issue.message, "async says no");
    }

    #[test]
    fn test_panicking_validator_is_omitted() {
        let panics: Arc<dyn Validator> = Arc::new(validator_fn(|_| panic!("boom")));
        let clauses = vec![clause(vec![panics, shared(Schema::string())])];
        let err = build_diagnostics(&json!(1), &clauses, None, &MatchConfig::default());
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].schema, 1);
    }

    #[test]
    fn test_unknown_discriminator_skips_revalidation() {
        let tagged = |tag: &str| {
            shared(
                Schema::object()
                    .field("type", Schema::literal(tag))
                    .build(),
            )
        };
        let clauses = vec![clause(vec![tagged("a")]), clause(vec![tagged("b")])];
        let compiler = Compiler::new();
        let config = MatchConfig::default();
        let table = build_dispatch_table(&clauses, &compiler, &config).unwrap();

        let err = build_diagnostics(&json!({"type": "z"}), &clauses, Some(&table), &config);
        assert!(err.issues.is_empty());
        assert!(err.schemas.is_empty());
        let info = err.discriminator.unwrap();
        assert_eq!(info.value, Some(json!("z")));
        assert!(!info.matched);
        assert!(err.message.contains("unknown value \"z\""));

        let err = build_diagnostics(&json!({}), &clauses, Some(&table), &config);
        assert_eq!(err.discriminator.unwrap().value, None);
        assert!(err.message.contains("is missing"));
    }

    #[test]
    fn test_parallel_preserves_order() {
        let clauses: Vec<Arc<Clause<()>>> = (0..16)
            .map(|_| clause(vec![shared(Schema::string())]))
            .collect();
        let config = MatchConfig::default().with_parallel_diagnostics(true);
        let err = build_diagnostics(&json!(1), &clauses, None, &config);
        let cases: Vec<usize> = err.issues.iter().map(|i| i.case).collect();
        assert_eq!(cases, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_preview_truncates() {
        let long = json!("x".repeat(50));
        let text = preview(&long, 10);
        assert_eq!(text, format!("\"{}...", "x".repeat(9)));
        assert_eq!(preview(&json!(1), 10), "1");
    }

    #[test]
    fn test_preview_of_deep_input_is_a_placeholder() {
        let mut deep = json!(0);
        for _ in 0..200 {
            deep = json!([deep]);
        }
        assert_eq!(preview(&deep, 200), UNPRINTABLE);
    }
}
