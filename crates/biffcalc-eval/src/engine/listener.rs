//! Observer hooks into the cache, for tests and diagnostics.

use super::cache::CellKey;
use biffcalc_common::ValueResult;

/// Receives cache events as they happen. Every method defaults to a no-op.
pub trait EvaluationListener: Send + Sync {
    fn on_cache_hit(&self, cell: CellKey, value: &ValueResult) {}

    fn on_read_plain_value(&self, cell: CellKey, value: &ValueResult) {}

    fn on_start_evaluate(&self, cell: CellKey) {}

    fn on_end_evaluate(&self, cell: CellKey, value: &ValueResult) {}

    fn on_clear_whole_cache(&self) {}

    /// The changed cell's own formula entry was dropped or marked stale.
    fn on_clear_cached_value(&self, cell: CellKey) {}

    /// A formula downstream of a change was marked stale; `depth` is its
    /// distance from the changed cell.
    fn on_clear_dependent_cached_value(&self, cell: CellKey, depth: usize) {}
}
