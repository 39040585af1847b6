//! Storage for compiled match plans.
//!
//! Plans are cached by validator identity with two backends:
//!
//! - [`MatcherSlot`]: a write-once cell carried by the validator itself
//!   (native schemas have one)
//! - [`SideTable`]: an identity-keyed map for validators without a slot
//!
//! Neither backend owns the validator, so caching never keeps a validator
//! alive or forms a reference cycle with it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::compile::MatchPlan;
use crate::validator::Validator;

/// Inserts between sweeps of dead side-table entries.
const PRUNE_INTERVAL: usize = 64;

/// A write-once cell holding a validator's compiled plan.
///
/// Validators that can carry their own cache return one from
/// [`Validator::matcher_slot`]; the compiler fills it on first use.
#[derive(Default)]
pub struct MatcherSlot(OnceLock<Arc<MatchPlan>>);

impl MatcherSlot {
    pub fn is_compiled(&self) -> bool {
        self.0.get().is_some()
    }

    pub(crate) fn get_or_init(&self, build: impl FnOnce() -> MatchPlan) -> Arc<MatchPlan> {
        Arc::clone(self.0.get_or_init(|| Arc::new(build())))
    }
}

impl fmt::Debug for MatcherSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherSlot")
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

type Entry = (Weak<dyn Validator>, Arc<MatchPlan>);

/// Plans for validators without a slot, keyed by `Arc` address.
///
/// Each entry keeps a `Weak` to its validator: an entry whose validator is
/// gone is stale, even if a new validator was allocated at the same address.
#[derive(Default)]
pub(crate) struct SideTable {
    entries: RwLock<HashMap<usize, Entry>>,
    inserts: AtomicUsize,
}

fn address(validator: &Arc<dyn Validator>) -> usize {
    Arc::as_ptr(validator) as *const () as usize
}

fn is_live_entry(entry: &Entry, validator: &Arc<dyn Validator>) -> bool {
    entry
        .0
        .upgrade()
        .is_some_and(|live| std::ptr::addr_eq(Arc::as_ptr(&live), Arc::as_ptr(validator)))
}

impl SideTable {
    pub(crate) fn get_or_insert(
        &self,
        validator: &Arc<dyn Validator>,
        build: impl FnOnce() -> MatchPlan,
    ) -> Arc<MatchPlan> {
        let key = address(validator);

        if let Some(entry) = self.entries.read().get(&key) {
            if is_live_entry(entry, validator) {
                return Arc::clone(&entry.1);
            }
        }

        let mut entries = self.entries.write();
        // Another thread may have compiled it while we waited.
        if let Some(entry) = entries.get(&key) {
            if is_live_entry(entry, validator) {
                return Arc::clone(&entry.1);
            }
        }

        let plan = Arc::new(build());
        entries.insert(key, (Arc::downgrade(validator), Arc::clone(&plan)));

        if self.inserts.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        }
        plan
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
