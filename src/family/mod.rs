//! Validator families the compiler knows how to accelerate.
//!
//! A [`FamilyAdapter`] recognizes validators of one family through the
//! introspection hints of the [`Validator`] trait and offers faster
//! matching and discriminator extraction for them. The compiler consults
//! its adapters in order; validators no adapter recognizes take the
//! generic path.

mod described;
mod native;

use std::sync::Arc;

use serde_json::Value;

use crate::compile::Accelerated;
use crate::discriminant::Discriminator;
use crate::schema::is_scalar;
use crate::validator::Validator;

pub use described::DescribedFamily;
pub use native::NativeFamily;

/// Capability detection for one validator family.
pub trait FamilyAdapter: Send + Sync {
    /// Short name reported by [`CompiledMatcher::family`](crate::CompiledMatcher::family).
    fn name(&self) -> &'static str;

    fn detect(&self, validator: &dyn Validator) -> bool;

    /// The single scalar the validator accepts, when it accepts exactly one
    /// and returns it unchanged.
    fn literal(&self, _validator: &dyn Validator) -> Option<Value> {
        None
    }

    /// A faster equivalent of `validate`.
    fn compile_accelerated(&self, _validator: &dyn Validator) -> Option<Box<dyn Accelerated>> {
        None
    }

    /// A required top-level object field pinned to a scalar literal.
    fn extract_discriminator(
        &self,
        _validator: &dyn Validator,
        _priority: &[String],
    ) -> Option<Discriminator> {
        None
    }
}

/// The built-in adapters in lookup order.
pub fn default_adapters() -> Vec<Arc<dyn FamilyAdapter>> {
    vec![Arc::new(NativeFamily), Arc::new(DescribedFamily)]
}

/// Picks the discriminator among qualifying `(key, literal)` fields.
///
/// Names in `priority` are tried in order; otherwise the first declared
/// field wins. Non-scalar literals never qualify.
pub fn pick_discriminator<'a>(
    fields: impl IntoIterator<Item = (&'a str, &'a Value)>,
    priority: &[String],
) -> Option<Discriminator> {
    let fields: Vec<(&str, &Value)> = fields
        .into_iter()
        .filter(|(_, value)| is_scalar(value))
        .collect();

    let (key, value) = priority
        .iter()
        .find_map(|name| fields.iter().find(|(key, _)| *key == name.as_str()))
        .or_else(|| fields.first())?;

    Some(Discriminator {
        key: key.to_string(),
        value: (*value).clone(),
    })
}
