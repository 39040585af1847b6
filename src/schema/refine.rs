//! Refinements and transforms layered on top of a schema.
//!
//! Each method wraps the receiver in a new node, so the original schema
//! instance is left unchanged. Any of these makes the compiler's precheck
//! partial: the value must still go through full validation.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::schema::shape::{Rule, Shape};
use crate::schema::Schema;
use crate::validator::BoxFuture;

impl Schema {
    fn with_rule(self, rule: Rule) -> Self {
        Schema::from_shape(Shape::Refined {
            inner: self,
            rule,
            message: None,
        })
    }

    /// String length (in chars) or array length of at least `min`.
    pub fn min_len(self, min: usize) -> Self {
        self.with_rule(Rule::MinLength(min))
    }

    pub fn max_len(self, max: usize) -> Self {
        self.with_rule(Rule::MaxLength(max))
    }

    /// Strings matching `pattern`. Fails if the pattern does not compile.
    ///
    /// ```rust
    /// use schematch::Schema;
    ///
    /// let digits = Schema::string().pattern(r"^\d+$").unwrap();
    /// assert!(Schema::string().pattern("(").is_err());
    /// ```
    pub fn pattern(self, pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(self.with_rule(Rule::Pattern(regex)))
    }

    pub fn min(self, min: f64) -> Self {
        self.with_rule(Rule::Minimum(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.with_rule(Rule::Maximum(max))
    }

    /// Numbers strictly greater than zero.
    pub fn positive(self) -> Self {
        self.refine(|v| v.as_f64().is_some_and(|n| n > 0.0), "must be positive")
    }

    /// A custom synchronous check with its own failure message.
    pub fn refine<F>(self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Schema::from_shape(Shape::Refined {
            inner: self,
            rule: Rule::Custom(Arc::new(check)),
            message: Some(message.into()),
        })
    }

    /// A check that must suspend (database lookups, remote calls).
    ///
    /// Validation returns a pending result once the synchronous checks
    /// pass; synchronous matching reports such schemas as needing the
    /// async API.
    pub fn refine_async<F>(self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Schema::from_shape(Shape::AsyncRefined {
            inner: self,
            check: Arc::new(check),
            message: message.into(),
        })
    }

    /// Maps the validated value to a new value.
    ///
    /// ```rust
    /// use schematch::{Schema, Validator};
    /// use serde_json::json;
    ///
    /// let upper = Schema::string().transform(|v| json!(v.as_str().unwrap_or_default().to_uppercase()));
    /// let out = upper.validate(&json!("abc")).into_ready().unwrap();
    /// assert_eq!(out.into_result().unwrap(), json!("ABC"));
    /// ```
    pub fn transform<F>(self, map: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Schema::from_shape(Shape::Transform {
            inner: self,
            map: Arc::new(map),
        })
    }
}
