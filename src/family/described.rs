use serde_json::Value;

use crate::compile::precheck::{self, Precheck};
use crate::compile::{generic_attempt, generic_attempt_async, Accelerated, Attempt};
use crate::discriminant::Discriminator;
use crate::family::{pick_discriminator, FamilyAdapter};
use crate::validator::{BoxFuture, Validator};

/// Adapter for validators that describe themselves with JSON Schema.
///
/// The description only yields a partial precheck: it rejects early, and
/// values passing it are still handed to `validate`. There is no literal
/// fast path, since the validator may transform even a `const` value.
pub struct DescribedFamily;

impl FamilyAdapter for DescribedFamily {
    fn name(&self) -> &'static str {
        "described"
    }

    fn detect(&self, validator: &dyn Validator) -> bool {
        validator.json_schema().is_some()
    }

    fn compile_accelerated(&self, validator: &dyn Validator) -> Option<Box<dyn Accelerated>> {
        let description = validator.json_schema()?;
        Some(Box::new(DescribedMatcher {
            precheck: precheck::from_json_schema(&description).check,
        }))
    }

    fn extract_discriminator(
        &self,
        validator: &dyn Validator,
        priority: &[String],
    ) -> Option<Discriminator> {
        let description = validator.json_schema()?;
        if description.get("type").and_then(Value::as_str) != Some("object") {
            return None;
        }
        let properties = description.get("properties")?.as_object()?;
        let required: Vec<&str> = description
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        // JSON Schema compares numbers by value, so numeric consts cannot be
        // keyed exactly.
        let fields = properties.iter().filter_map(|(key, property)| {
            let constant = property.get("const").filter(|c| !c.is_number())?;
            required
                .contains(&key.as_str())
                .then_some((key.as_str(), constant))
        });
        pick_discriminator(fields, priority)
    }
}

struct DescribedMatcher {
    precheck: Precheck,
}

impl Accelerated for DescribedMatcher {
    fn attempt(&self, validator: &dyn Validator, input: &Value) -> Attempt {
        if !self.precheck.passes(input) {
            return Attempt::NoMatch;
        }
        generic_attempt(validator, input)
    }

    fn attempt_async<'a>(
        &'a self,
        validator: &'a dyn Validator,
        input: &'a Value,
    ) -> BoxFuture<'a, Attempt> {
        if !self.precheck.passes(input) {
            return Box::pin(async { Attempt::NoMatch });
        }
        generic_attempt_async(validator, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Issues;
    use crate::validator::Validated;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stillwater::Validation;

    /// Accepts `{"type": "ok", "value": <number>}` and counts `validate` calls.
    struct Described {
        calls: AtomicUsize,
    }

    impl Validator for Described {
        fn validate(&self, value: &Value) -> Validated<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ok = value["type"] == "ok" && value["value"].is_number();
            Validated::Ready(if ok {
                Validation::Success(value.clone())
            } else {
                Validation::Failure(Issues::message("not ok"))
            })
        }

        fn json_schema(&self) -> Option<Value> {
            Some(json!({
                "type": "object",
                "properties": {
                    "type": {"const": "ok"},
                    "value": {"type": "number"}
                },
                "required": ["type", "value"]
            }))
        }
    }

    #[test]
    fn test_precheck_rejects_without_validating() {
        let validator = Described {
            calls: AtomicUsize::new(0),
        };
        let m = DescribedFamily.compile_accelerated(&validator).unwrap();
        assert_eq!(m.attempt(&validator, &json!({"type": "err"})), Attempt::NoMatch);
        assert_eq!(m.attempt(&validator, &json!("ok")), Attempt::NoMatch);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);

        assert!(matches!(
            m.attempt(&validator, &json!({"type": "ok", "value": 1})),
            Attempt::Matched(_)
        ));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extracts_required_const() {
        let validator = Described {
            calls: AtomicUsize::new(0),
        };
        let found = DescribedFamily
            .extract_discriminator(&validator, &["type".to_string()])
            .unwrap();
        assert_eq!(found.key, "type");
        assert_eq!(found.value, json!("ok"));
    }

    #[test]
    fn test_no_literal_fast_path() {
        let validator = Described {
            calls: AtomicUsize::new(0),
        };
        assert!(DescribedFamily.literal(&validator).is_none());
    }
}
