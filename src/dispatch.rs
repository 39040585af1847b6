//! Discriminator dispatch tables.
//!
//! When the clauses of a list agree on a discriminator field (for example
//! every schema pins `type` to a literal), a [`DispatchTable`] maps each
//! discriminator value to the clauses that can accept it. The executor then
//! visits only those clauses plus the fallback clauses, in declaration
//! order, so pruning never changes which clause wins.
//!
//! A clause is keyed only when every one of its schemas yields a
//! discriminator; a clause with one schema the compiler cannot see into
//! falls back and is always visited.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::clause::Clause;
use crate::compile::Compiler;
use crate::config::MatchConfig;
use crate::discriminant::{Discriminant, Discriminator};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// Clauses registered under this value, ascending.
    clauses: Vec<usize>,
    /// `clauses` merged with the fallback clauses, ascending.
    candidates: Vec<usize>,
}

/// Routes inputs to candidate clauses by a shared discriminator field.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    key: String,
    entries: IndexMap<Discriminant, Entry>,
    fallback: Vec<usize>,
}

/// Which clauses an input must be tried against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'t> {
    /// The input is not an object; every clause is a candidate.
    Linear,
    /// Only these clause indices, ascending.
    Candidates(&'t [usize]),
}

/// What the table knows about an input's discriminator.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'t, 'i> {
    /// The input is not an object.
    NotKeyed,
    /// The key is missing or its value is not in the table.
    Miss { value: Option<&'i Value> },
    Hit {
        value: &'i Value,
        /// Clauses registered under `value`, fallback excluded.
        clauses: &'t [usize],
    },
}

impl DispatchTable {
    /// The discriminator field name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Every value some clause is keyed on, in first-seen order.
    pub fn expected(&self) -> Vec<Value> {
        self.entries.values().map(|entry| entry.value.clone()).collect()
    }

    /// Clauses visited for every keyed input.
    pub fn fallback(&self) -> &[usize] {
        &self.fallback
    }

    /// Clauses registered under `value`, if any.
    pub fn clauses_for(&self, value: &Value) -> Option<&[usize]> {
        let tag = Discriminant::from_value(value)?;
        self.entries.get(&tag).map(|entry| entry.clauses.as_slice())
    }

    pub fn lookup<'t, 'i>(&'t self, input: &'i Value) -> Lookup<'t, 'i> {
        let Some(obj) = input.as_object() else {
            return Lookup::NotKeyed;
        };
        let Some(value) = obj.get(&self.key) else {
            return Lookup::Miss { value: None };
        };
        match self.entry(value) {
            Some(entry) => Lookup::Hit {
                value,
                clauses: &entry.clauses,
            },
            None => Lookup::Miss { value: Some(value) },
        }
    }

    pub fn route(&self, input: &Value) -> Route<'_> {
        let Some(obj) = input.as_object() else {
            return Route::Linear;
        };
        match obj.get(&self.key).and_then(|value| self.entry(value)) {
            Some(entry) => Route::Candidates(&entry.candidates),
            None => Route::Candidates(&self.fallback),
        }
    }

    fn entry(&self, value: &Value) -> Option<&Entry> {
        self.entries.get(&Discriminant::from_value(value)?)
    }
}

/// Builds the dispatch table for `clauses`, if one applies.
///
/// Returns `None` when dispatch is disabled, there are fewer than two
/// clauses, no clause is keyed, or two schemas disagree on the key name.
pub fn build_dispatch_table<R>(
    clauses: &[Arc<Clause<R>>],
    compiler: &Compiler,
    config: &MatchConfig,
) -> Option<DispatchTable> {
    if !config.dispatch || clauses.len() < 2 {
        return None;
    }

    let mut key: Option<String> = None;
    let mut entries: IndexMap<Discriminant, Entry> = IndexMap::new();
    let mut fallback = Vec::new();

    for (idx, clause) in clauses.iter().enumerate() {
        let validators = clause.validators();
        let found: Option<Vec<Discriminator>> = if validators.is_empty() {
            None
        } else {
            validators
                .iter()
                .map(|v| compiler.extract_discriminator(v.as_ref(), &config.discriminator_priority))
                .collect()
        };
        let Some(found) = found else {
            fallback.push(idx);
            continue;
        };

        for discriminator in &found {
            match &key {
                None => key = Some(discriminator.key.clone()),
                Some(k) if *k != discriminator.key => {
                    tracing::debug!(
                        first = %k,
                        conflicting = %discriminator.key,
                        case = idx,
                        "discriminator keys disagree; using linear scan"
                    );
                    return None;
                }
                Some(_) => {}
            }
        }

        let tags: Option<Vec<(Discriminant, Value)>> = found
            .into_iter()
            .map(|d| Discriminant::from_value(&d.value).map(|tag| (tag, d.value)))
            .collect();
        let Some(tags) = tags else {
            fallback.push(idx);
            continue;
        };
        for (tag, value) in tags {
            let entry = entries.entry(tag).or_insert_with(|| Entry {
                value,
                clauses: Vec::new(),
                candidates: Vec::new(),
            });
            if entry.clauses.last() != Some(&idx) {
                entry.clauses.push(idx);
            }
        }
    }

    let key = key?;
    for entry in entries.values_mut() {
        entry.candidates = merge_ascending(&entry.clauses, &fallback);
    }
    tracing::debug!(
        key = %key,
        values = entries.len(),
        fallback = fallback.len(),
        "built dispatch table"
    );
    Some(DispatchTable {
        key,
        entries,
        fallback,
    })
}

fn merge_ascending(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            merged.push(a[i]);
            i += 1;
        } else {
            merged.push(b[j]);
            j += 1;
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{Handler, Predicate};
    use crate::schema::Schema;
    use crate::validator::{validator_fn, Validator};
    use serde_json::json;
    use stillwater::Validation;

    fn tagged(key: &str, value: &str) -> Arc<dyn Validator> {
        Arc::new(
            Schema::object()
                .field(key, Schema::literal(value))
                .field("value", Schema::any())
                .build(),
        )
    }

    fn clause(schemas: Vec<Arc<dyn Validator>>) -> Clause<()> {
        Clause::schemas(schemas, None, Handler::constant(()))
    }

    fn build(clauses: Vec<Clause<()>>) -> Option<DispatchTable> {
        let clauses: Vec<Arc<Clause<()>>> = clauses.into_iter().map(Arc::new).collect();
        build_dispatch_table(&clauses, &Compiler::new(), &MatchConfig::default())
    }

    #[test]
    fn test_groups_by_value_with_fallback() {
        let opaque: Arc<dyn Validator> = Arc::new(validator_fn(|v| Validation::Success(v.clone())));
        let table = build(vec![
            clause(vec![tagged("type", "ok")]),
            clause(vec![opaque]),
            clause(vec![tagged("type", "err")]),
            clause(vec![tagged("type", "ok")]),
        ])
        .unwrap();

        assert_eq!(table.key(), "type");
        assert_eq!(table.expected(), vec![json!("ok"), json!("err")]);
        assert_eq!(table.fallback(), &[1]);
        assert_eq!(table.route(&json!({"type": "ok"})), Route::Candidates(&[0, 1, 3]));
        assert_eq!(table.route(&json!({"type": "err"})), Route::Candidates(&[1, 2]));
        assert_eq!(table.route(&json!({"type": "nope"})), Route::Candidates(&[1]));
        assert_eq!(table.route(&json!({})), Route::Candidates(&[1]));
        assert_eq!(table.route(&json!("ok")), Route::Linear);
    }

    #[test]
    fn test_clause_with_several_values() {
        let table = build(vec![
            clause(vec![tagged("type", "a"), tagged("type", "b")]),
            clause(vec![tagged("type", "b")]),
        ])
        .unwrap();
        assert_eq!(table.clauses_for(&json!("a")), Some(&[0][..]));
        assert_eq!(table.clauses_for(&json!("b")), Some(&[0, 1][..]));
    }

    #[test]
    fn test_partially_keyed_clause_falls_back() {
        let table = build(vec![
            clause(vec![tagged("type", "a"), Arc::new(Schema::string()) as Arc<dyn Validator>]),
            clause(vec![tagged("type", "b")]),
        ])
        .unwrap();
        assert_eq!(table.fallback(), &[0]);
        assert_eq!(table.expected(), vec![json!("b")]);
    }

    #[test]
    fn test_conflicting_keys_abort() {
        assert!(build(vec![
            clause(vec![tagged("type", "a")]),
            clause(vec![tagged("kind", "b")]),
        ])
        .is_none());
    }

    #[test]
    fn test_requires_two_clauses_and_a_key() {
        assert!(build(vec![clause(vec![tagged("type", "a")])]).is_none());
        assert!(build(vec![
            clause(vec![Arc::new(Schema::string()) as Arc<dyn Validator>]),
            clause(vec![Arc::new(Schema::number()) as Arc<dyn Validator>]),
        ])
        .is_none());
    }

    #[test]
    fn test_when_clauses_fall_back() {
        let table = build(vec![
            Clause::when(Predicate::new(|_| false), Handler::constant(())),
            clause(vec![tagged("type", "a")]),
        ])
        .unwrap();
        assert_eq!(table.fallback(), &[0]);
    }

    #[test]
    fn test_disabled_by_config() {
        let clauses: Vec<Arc<Clause<()>>> = vec![
            Arc::new(clause(vec![tagged("type", "a")])),
            Arc::new(clause(vec![tagged("type", "b")])),
        ];
        let config = MatchConfig::default().with_dispatch(false);
        assert!(build_dispatch_table(&clauses, &Compiler::new(), &config).is_none());
    }

    #[test]
    fn test_lookup() {
        let table = build(vec![
            clause(vec![tagged("type", "a")]),
            clause(vec![tagged("type", "b")]),
        ])
        .unwrap();
        assert!(matches!(table.lookup(&json!(1)), Lookup::NotKeyed));
        assert!(matches!(table.lookup(&json!({})), Lookup::Miss { value: None }));
        assert!(matches!(
            table.lookup(&json!({"type": "c"})),
            Lookup::Miss { value: Some(_) }
        ));
        assert!(matches!(
            table.lookup(&json!({"type": "b"})),
            Lookup::Hit { clauses: [1], .. }
        ));
    }

    #[test]
    fn test_merge_ascending() {
        assert_eq!(merge_ascending(&[0, 3, 5], &[1, 4]), vec![0, 1, 3, 4, 5]);
        assert_eq!(merge_ascending(&[], &[2]), vec![2]);
    }
}
