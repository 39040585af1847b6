//! First-match-wins clause evaluation.
//!
//! Clauses are visited in declaration order. With a dispatch table and an
//! object input only the routed candidates are visited, still in ascending
//! order; otherwise every clause is. Within a schema clause each schema is
//! tried in turn, and a failing guard moves on to the clause's next schema.
//!
//! The synchronous executor never suspends: reaching an asynchronous
//! validator, guard, predicate or handler is reported as
//! [`MatchFault::AsyncRequired`].

use std::ops::Range;
use std::slice;
use std::sync::Arc;

use serde_json::Value;

use crate::clause::{Clause, Guard, Handler, Predicate};
use crate::compile::{Attempt, Compiler};
use crate::dispatch::{DispatchTable, Route};
use crate::error::{AsyncSource, MatchFault};

/// Outcome of running a clause list against one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution<R> {
    /// `case` is the index of the clause whose handler produced `output`.
    Matched { case: usize, output: R },
    Unmatched,
}

impl<R> Execution<R> {
    pub fn case(&self) -> Option<usize> {
        match self {
            Execution::Matched { case, .. } => Some(*case),
            Execution::Unmatched => None,
        }
    }

    pub fn into_output(self) -> Option<R> {
        match self {
            Execution::Matched { output, .. } => Some(output),
            Execution::Unmatched => None,
        }
    }
}

enum Visit<'t> {
    Linear(Range<usize>),
    Routed(slice::Iter<'t, usize>),
}

impl Iterator for Visit<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Visit::Linear(range) => range.next(),
            Visit::Routed(indices) => indices.next().copied(),
        }
    }
}

fn visit_order<'t>(len: usize, table: Option<&'t DispatchTable>, input: &Value) -> Visit<'t> {
    match table.map(|table| table.route(input)) {
        Some(Route::Candidates(indices)) => Visit::Routed(indices.iter()),
        Some(Route::Linear) | None => Visit::Linear(0..len),
    }
}

fn async_required(case: usize, origin: AsyncSource) -> MatchFault {
    tracing::debug!(case, %origin, "asynchronous step reached on the sync path");
    MatchFault::AsyncRequired { case, origin }
}

/// Runs `clauses` against `input` without suspending.
///
/// `table` must have been built from the same clauses.
pub fn execute_sync<R>(
    clauses: &[Arc<Clause<R>>],
    table: Option<&DispatchTable>,
    input: &Value,
    compiler: &Compiler,
) -> Result<Execution<R>, MatchFault> {
    for case in visit_order(clauses.len(), table, input) {
        let Some(clause) = clauses.get(case) else {
            continue;
        };
        match clause.as_ref() {
            Clause::When { predicate, handler } => {
                tracing::trace!(case, "evaluating predicate");
                let hit = match predicate {
                    Predicate::Sync(check) => check(input),
                    Predicate::Async(_) => return Err(async_required(case, AsyncSource::Predicate)),
                };
                if hit {
                    return run_handler(case, handler, input.clone(), input);
                }
            }
            Clause::Schemas {
                schemas,
                guard,
                handler,
            } => {
                for (position, schema) in schemas.iter().enumerate() {
                    tracing::trace!(case, schema = position, "attempting schema");
                    let value = match compiler.compile(schema).sync_attempt(input) {
                        Attempt::NoMatch => continue,
                        Attempt::AsyncRequired => {
                            return Err(async_required(case, AsyncSource::Validator(position)))
                        }
                        Attempt::Matched(value) => value,
                    };
                    match guard {
                        None => {}
                        Some(Guard::Sync(check)) => {
                            if !check(&value, input) {
                                tracing::trace!(case, schema = position, "guard rejected");
                                continue;
                            }
                        }
                        Some(Guard::Async(_)) => {
                            return Err(async_required(case, AsyncSource::Guard))
                        }
                    }
                    return run_handler(case, handler, value, input);
                }
            }
        }
    }
    Ok(Execution::Unmatched)
}

fn run_handler<R>(
    case: usize,
    handler: &Handler<R>,
    value: Value,
    input: &Value,
) -> Result<Execution<R>, MatchFault> {
    match handler {
        Handler::Sync(handle) => Ok(Execution::Matched {
            case,
            output: handle(value, input),
        }),
        Handler::Async(_) => Err(async_required(case, AsyncSource::Handler)),
    }
}

/// Runs `clauses` against `input`, awaiting asynchronous steps.
///
/// Clauses and schemas are evaluated one at a time in the same order as
/// [`execute_sync`]; suspension never reorders evaluation.
pub async fn execute_async<R>(
    clauses: &[Arc<Clause<R>>],
    table: Option<&DispatchTable>,
    input: &Value,
    compiler: &Compiler,
) -> Result<Execution<R>, MatchFault> {
    for case in visit_order(clauses.len(), table, input) {
        let Some(clause) = clauses.get(case) else {
            continue;
        };
        match clause.as_ref() {
            Clause::When { predicate, handler } => {
                let hit = match predicate {
                    Predicate::Sync(check) => check(input),
                    Predicate::Async(check) => check(input.clone()).await,
                };
                if hit {
                    return Ok(Execution::Matched {
                        case,
                        output: handle_async(handler, input.clone(), input).await,
                    });
                }
            }
            Clause::Schemas {
                schemas,
                guard,
                handler,
            } => {
                for (position, schema) in schemas.iter().enumerate() {
                    tracing::trace!(case, schema = position, "attempting schema");
                    let matcher = compiler.compile(schema);
                    let Attempt::Matched(value) = matcher.async_attempt(input).await else {
                        continue;
                    };
                    let admitted = match guard {
                        None => true,
                        Some(Guard::Sync(check)) => check(&value, input),
                        Some(Guard::Async(check)) => check(value.clone(), input.clone()).await,
                    };
                    if !admitted {
                        tracing::trace!(case, schema = position, "guard rejected");
                        continue;
                    }
                    return Ok(Execution::Matched {
                        case,
                        output: handle_async(handler, value, input).await,
                    });
                }
            }
        }
    }
    Ok(Execution::Unmatched)
}

async fn handle_async<R>(handler: &Handler<R>, value: Value, input: &Value) -> R {
    match handler {
        Handler::Sync(handle) => handle(value, input),
        Handler::Async(handle) => handle(value, input.clone()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::dispatch::build_dispatch_table;
    use crate::schema::Schema;
    use crate::validator::{async_validator_fn, Validator};
    use serde_json::json;
    use stillwater::Validation;

    fn shared(schema: Schema) -> Arc<dyn Validator> {
        Arc::new(schema)
    }

    fn schemas(list: Vec<Schema>, result: &'static str) -> Arc<Clause<&'static str>> {
        Arc::new(Clause::schemas(
            list.into_iter().map(shared).collect(),
            None,
            Handler::constant(result),
        ))
    }

    fn run(clauses: &[Arc<Clause<&'static str>>], input: Value) -> Option<&'static str> {
        execute_sync(clauses, None, &input, &Compiler::new())
            .unwrap()
            .into_output()
    }

    #[test]
    fn test_first_match_wins() {
        let clauses = vec![
            schemas(vec![Schema::literal(2), Schema::literal(3)], "small"),
            schemas(vec![Schema::number()], "other"),
        ];
        assert_eq!(run(&clauses, json!(3)), Some("small"));
        assert_eq!(run(&clauses, json!(9)), Some("other"));
        assert_eq!(run(&clauses, json!("x")), None);
    }

    #[test]
    fn test_guard_falls_through_to_next_schema_of_same_clause() {
        let clauses = vec![
            Arc::new(Clause::schemas(
                vec![
                    shared(Schema::literal(5)),
                    shared(Schema::number().transform(|_| json!(100))),
                ],
                Some(Guard::new(|value, _| value.as_i64().is_some_and(|n| n > 10))),
                Handler::new(|value, _| if value == json!(100) { "second" } else { "first" }),
            )),
            schemas(vec![Schema::number()], "fallback"),
        ];
        assert_eq!(run(&clauses, json!(5)), Some("second"));
    }

    #[test]
    fn test_handler_receives_validated_and_input() {
        let clauses: Vec<Arc<Clause<String>>> = vec![Arc::new(Clause::schemas(
            vec![shared(Schema::string().transform(|v| json!(v.as_str().map(str::len))))],
            None,
            Handler::new(|value, input| format!("{} {}", value, input)),
        ))];
        let out = execute_sync(&clauses, None, &json!("abc"), &Compiler::new()).unwrap();
        assert_eq!(
            out,
            Execution::Matched {
                case: 0,
                output: "3 \"abc\"".to_string()
            }
        );
    }

    #[test]
    fn test_when_clause() {
        let clauses = vec![
            Arc::new(Clause::when(
                Predicate::new(|v| v.is_array()),
                Handler::new(|value, input| {
                    assert_eq!(&value, input);
                    "array"
                }),
            )),
            schemas(vec![Schema::any()], "any"),
        ];
        assert_eq!(run(&clauses, json!([1])), Some("array"));
        assert_eq!(run(&clauses, json!(1)), Some("any"));
    }

    #[test]
    fn test_async_validator_on_sync_path_is_a_fault() {
        let pending: Arc<dyn Validator> = Arc::new(async_validator_fn(|v| {
            Box::pin(async move { Validation::Success(v) })
        }));
        let clauses: Vec<Arc<Clause<()>>> = vec![Arc::new(Clause::schemas(
            vec![shared(Schema::string()), pending],
            None,
            Handler::constant(()),
        ))];
        let err = execute_sync(&clauses, None, &json!(1), &Compiler::new()).unwrap_err();
        assert!(matches!(
            err,
            MatchFault::AsyncRequired {
                case: 0,
                origin: AsyncSource::Validator(1)
            }
        ));
    }

    #[test]
    fn test_async_handler_on_sync_path_is_a_fault() {
        let clauses: Vec<Arc<Clause<u8>>> = vec![Arc::new(Clause::schemas(
            vec![shared(Schema::any())],
            None,
            Handler::new_async(|_, _| Box::pin(async { 1 })),
        ))];
        let err = execute_sync(&clauses, None, &json!(1), &Compiler::new()).unwrap_err();
        assert!(matches!(
            err,
            MatchFault::AsyncRequired {
                origin: AsyncSource::Handler,
                ..
            }
        ));
    }

    #[test]
    fn test_table_skips_other_values() {
        let tagged = |tag: &str| {
            Schema::object()
                .field("type", Schema::literal(tag))
                .build()
        };
        let clauses = vec![
            schemas(vec![tagged("a")], "a"),
            schemas(vec![tagged("b")], "b"),
        ];
        let compiler = Compiler::new();
        let table = build_dispatch_table(&clauses, &compiler, &MatchConfig::default()).unwrap();
        let out = execute_sync(&clauses, Some(&table), &json!({"type": "b"}), &compiler).unwrap();
        assert_eq!(out.case(), Some(1));
        let out = execute_sync(&clauses, Some(&table), &json!({"type": "c"}), &compiler).unwrap();
        assert_eq!(out, Execution::Unmatched);
    }

    #[tokio::test]
    async fn test_async_guard_and_handler() {
        let clauses: Vec<Arc<Clause<String>>> = vec![
            Arc::new(Clause::schemas(
                vec![shared(Schema::number())],
                Some(Guard::new_async(|value, _| {
                    Box::pin(async move { value.as_f64().is_some_and(|n| n > 10.0) })
                })),
                Handler::new_async(|value, _| Box::pin(async move { format!("big {}", value) })),
            )),
            Arc::new(Clause::schemas(
                vec![shared(Schema::number())],
                None,
                Handler::new(|_, _| "small".to_string()),
            )),
        ];
        let compiler = Compiler::new();
        let out = execute_async(&clauses, None, &json!(12), &compiler).await.unwrap();
        assert_eq!(out.into_output().as_deref(), Some("big 12"));
        let out = execute_async(&clauses, None, &json!(4), &compiler).await.unwrap();
        assert_eq!(out.into_output().as_deref(), Some("small"));
    }
}
