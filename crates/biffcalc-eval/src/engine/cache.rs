//! Formula result cache with a reverse dependency index.
//!
//! Every formula entry remembers the cells and areas it read. The reverse
//! maps answer "who read this cell", so that a change can be fanned out to
//! exactly the formulas that saw the old value. Areas are found through a
//! per-sheet row interval index.

use super::interval_tree::IntervalTree;
use biffcalc_common::{AreaRef, ValueResult};
use rustc_hash::{FxHashMap, FxHashSet};

/// Identity of one cell in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub sheet: usize,
    pub row: u32,
    pub col: u32,
}

impl CellKey {
    pub const fn new(sheet: usize, row: u32, col: u32) -> Self {
        Self { sheet, row, col }
    }
}

/// An area read as a whole. Edits anywhere inside it, including cells that
/// were blank at read time, reach its readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaKey(pub AreaRef);

impl AreaKey {
    pub fn contains(&self, key: &CellKey) -> bool {
        self.0.contains(key.sheet, key.row, key.col)
    }

    fn covers_column(&self, col: u32) -> bool {
        (self.0.first_col..=self.0.last_col).contains(&col)
    }
}

#[derive(Debug, Clone, Default)]
struct FormulaEntry {
    /// `None` when the result was computed but not kept (volatile, or an
    /// inner member of a cycle). The inputs are still tracked.
    value: Option<ValueResult>,
    dirty: bool,
    cells: FxHashSet<CellKey>,
    areas: FxHashSet<AreaKey>,
}

/// Formula results, plain-cell snapshots and the reverse dependency maps.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    formulas: FxHashMap<CellKey, FormulaEntry>,
    /// Value of each plain cell as last read by a formula. Only kept while
    /// some formula still reads the cell directly.
    plain_values: FxHashMap<CellKey, ValueResult>,
    consumers: FxHashMap<CellKey, FxHashSet<CellKey>>,
    area_consumers: FxHashMap<AreaKey, FxHashSet<CellKey>>,
    /// Row intervals of every key in `area_consumers`, per sheet.
    area_rows: FxHashMap<usize, IntervalTree<AreaKey>>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result of a formula cell, unless it is dirty or was never kept.
    pub fn cached_value(&self, key: &CellKey) -> Option<&ValueResult> {
        self.formulas
            .get(key)
            .filter(|e| !e.dirty)
            .and_then(|e| e.value.as_ref())
    }

    pub fn has_formula_entry(&self, key: &CellKey) -> bool {
        self.formulas.contains_key(key)
    }

    pub fn is_dirty(&self, key: &CellKey) -> bool {
        self.formulas.get(key).is_some_and(|e| e.dirty)
    }

    /// Number of formula entries holding a usable value.
    pub fn len(&self) -> usize {
        self.formulas
            .values()
            .filter(|e| !e.dirty && e.value.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the entry for `key`, relinking its inputs.
    pub fn store(
        &mut self,
        key: CellKey,
        value: Option<ValueResult>,
        cells: FxHashSet<CellKey>,
        areas: FxHashSet<AreaKey>,
    ) {
        let orphaned = self.unlink(&key);
        for input in &cells {
            self.consumers.entry(*input).or_default().insert(key);
        }
        for area in &areas {
            let readers = self.area_consumers.entry(*area).or_default();
            if readers.is_empty() {
                for sheet in area.0.sheets.sheets() {
                    self.area_rows
                        .entry(sheet)
                        .or_default()
                        .insert(area.0.first_row, area.0.last_row, *area);
                }
            }
            readers.insert(key);
        }
        self.prune_plain(orphaned);
        self.formulas.insert(
            key,
            FormulaEntry {
                value,
                dirty: false,
                cells,
                areas,
            },
        );
    }

    /// Flags a formula entry as stale. Returns true if it held a usable
    /// value before.
    pub fn mark_dirty(&mut self, key: &CellKey) -> bool {
        match self.formulas.get_mut(key) {
            Some(entry) if !entry.dirty => {
                entry.dirty = true;
                entry.value.is_some()
            }
            _ => false,
        }
    }

    /// Drops the formula entry of `key` and its outgoing links. Returns
    /// true if there was one.
    pub fn remove(&mut self, key: &CellKey) -> bool {
        let orphaned = self.unlink(key);
        self.prune_plain(orphaned);
        self.formulas.remove(key).is_some()
    }

    /// Snapshots a plain cell read by the formula being evaluated.
    pub fn record_plain(&mut self, key: CellKey, value: ValueResult) {
        self.plain_values.insert(key, value);
    }

    /// Updates the snapshot of an edited cell, unless no formula reads it
    /// directly.
    pub fn refresh_plain(&mut self, key: CellKey, value: ValueResult) {
        if self.consumers.contains_key(&key) {
            self.plain_values.insert(key, value);
        } else {
            self.plain_values.remove(&key);
        }
    }

    pub fn plain_snapshot_count(&self) -> usize {
        self.plain_values.len()
    }

    pub fn plain_value(&self, key: &CellKey) -> Option<&ValueResult> {
        self.plain_values.get(key)
    }

    pub fn forget_plain(&mut self, key: &CellKey) -> Option<ValueResult> {
        self.plain_values.remove(key)
    }

    /// Formula cells that read `key` directly or through an area.
    pub fn consumers_of(&self, key: &CellKey) -> Vec<CellKey> {
        let mut out: Vec<CellKey> = self
            .consumers
            .get(key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        if let Some(rows) = self.area_rows.get(&key.sheet) {
            for area in rows.stab(key.row).filter(|a| a.covers_column(key.col)) {
                if let Some(readers) = self.area_consumers.get(area) {
                    out.extend(readers.iter().copied());
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn clear(&mut self) {
        self.formulas.clear();
        self.plain_values.clear();
        self.consumers.clear();
        self.area_consumers.clear();
        self.area_rows.clear();
    }

    /// Number of distinct areas currently read by some formula.
    pub fn tracked_area_count(&self) -> usize {
        self.area_consumers.len()
    }

    /// Removes `key` from the reverse maps of everything it used to read.
    /// Returns the inputs left with no reader.
    fn unlink(&mut self, key: &CellKey) -> Vec<CellKey> {
        let mut orphaned = Vec::new();
        let Some(entry) = self.formulas.get(key) else {
            return orphaned;
        };
        for input in &entry.cells {
            if let Some(set) = self.consumers.get_mut(input) {
                set.remove(key);
                if set.is_empty() {
                    self.consumers.remove(input);
                    orphaned.push(*input);
                }
            }
        }
        for area in &entry.areas {
            if let Some(set) = self.area_consumers.get_mut(area) {
                set.remove(key);
                if set.is_empty() {
                    self.area_consumers.remove(area);
                    for sheet in area.0.sheets.sheets() {
                        if let Some(rows) = self.area_rows.get_mut(&sheet) {
                            rows.remove(area.0.first_row, area.0.last_row, area);
                            if rows.is_empty() {
                                self.area_rows.remove(&sheet);
                            }
                        }
                    }
                }
            }
        }
        orphaned
    }

    /// Drops snapshots of cells that lost their last reader.
    fn prune_plain(&mut self, orphaned: Vec<CellKey>) {
        for cell in orphaned {
            if !self.consumers.contains_key(&cell) {
                self.plain_values.remove(&cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biffcalc_common::SheetSpan;

    fn k(row: u32, col: u32) -> CellKey {
        CellKey::new(0, row, col)
    }

    fn set(keys: &[CellKey]) -> FxHashSet<CellKey> {
        keys.iter().copied().collect()
    }

    #[test]
    fn store_links_and_relinks_inputs() {
        let mut cache = EvaluationCache::new();
        cache.store(k(0, 1), Some(1.0.into()), set(&[k(0, 0)]), FxHashSet::default());
        assert_eq!(cache.consumers_of(&k(0, 0)), vec![k(0, 1)]);

        // re-evaluated with a different input: the old link goes away
        cache.store(k(0, 1), Some(2.0.into()), set(&[k(5, 5)]), FxHashSet::default());
        assert!(cache.consumers_of(&k(0, 0)).is_empty());
        assert_eq!(cache.consumers_of(&k(5, 5)), vec![k(0, 1)]);
        assert_eq!(cache.cached_value(&k(0, 1)).and_then(|v| v.as_number()), Some(2.0));
    }

    #[test]
    fn area_readers_see_cells_inside() {
        let mut cache = EvaluationCache::new();
        let area = AreaKey(AreaRef::new(SheetSpan::single(0), 0, 0, 9, 0));
        let mut areas = FxHashSet::default();
        areas.insert(area);
        cache.store(k(0, 3), Some(0.0.into()), FxHashSet::default(), areas);
        assert_eq!(cache.consumers_of(&k(7, 0)), vec![k(0, 3)]);
        assert!(cache.consumers_of(&k(7, 1)).is_empty());
        assert!(cache.consumers_of(&CellKey::new(1, 7, 0)).is_empty());
    }

    #[test]
    fn dirty_entries_are_not_served() {
        let mut cache = EvaluationCache::new();
        cache.store(k(0, 0), Some(3.0.into()), FxHashSet::default(), FxHashSet::default());
        assert!(cache.mark_dirty(&k(0, 0)));
        assert!(cache.cached_value(&k(0, 0)).is_none());
        assert!(cache.has_formula_entry(&k(0, 0)));
        assert!(!cache.mark_dirty(&k(0, 0)));
        assert!(cache.is_empty());
    }

    #[test]
    fn uncached_value_keeps_links() {
        let mut cache = EvaluationCache::new();
        cache.store(k(0, 1), None, set(&[k(0, 0)]), FxHashSet::default());
        assert!(cache.cached_value(&k(0, 1)).is_none());
        assert_eq!(cache.consumers_of(&k(0, 0)), vec![k(0, 1)]);
        assert!(cache.remove(&k(0, 1)));
        assert!(cache.consumers_of(&k(0, 0)).is_empty());
    }

    fn area(r1: u32, c1: u32, r2: u32, c2: u32) -> FxHashSet<AreaKey> {
        let mut areas = FxHashSet::default();
        areas.insert(AreaKey(AreaRef::new(SheetSpan::single(0), r1, c1, r2, c2)));
        areas
    }

    #[test]
    fn unrelated_areas_are_not_consumers() {
        let mut cache = EvaluationCache::new();
        // one reader per row block, far from row 5
        for i in 0..500u32 {
            let row = 100 + i * 10;
            cache.store(k(i, 20), Some(0.0.into()), FxHashSet::default(), area(row, 0, row + 9, 3));
        }
        cache.store(k(0, 30), Some(0.0.into()), FxHashSet::default(), area(0, 0, 9, 0));
        cache.store(k(1, 30), Some(0.0.into()), FxHashSet::default(), area(0, 1, 9, 1));
        assert_eq!(cache.tracked_area_count(), 502);

        assert_eq!(cache.consumers_of(&k(5, 0)), vec![k(0, 30)]);
        assert_eq!(cache.consumers_of(&k(5, 1)), vec![k(1, 30)]);
        assert_eq!(cache.consumers_of(&k(255, 2)), vec![k(15, 20)]);
        assert!(cache.consumers_of(&k(5, 2)).is_empty());

        cache.remove(&k(0, 30));
        assert!(cache.consumers_of(&k(5, 0)).is_empty());
        assert_eq!(cache.tracked_area_count(), 501);
    }

    #[test]
    fn shared_area_survives_one_reader_leaving() {
        let mut cache = EvaluationCache::new();
        cache.store(k(0, 5), Some(0.0.into()), FxHashSet::default(), area(0, 0, 9, 0));
        cache.store(k(1, 5), Some(0.0.into()), FxHashSet::default(), area(0, 0, 9, 0));
        cache.store(k(0, 5), Some(0.0.into()), FxHashSet::default(), FxHashSet::default());
        assert_eq!(cache.consumers_of(&k(3, 0)), vec![k(1, 5)]);
    }

    #[test]
    fn snapshots_follow_their_readers() {
        let mut cache = EvaluationCache::new();
        cache.record_plain(k(0, 0), 1.0.into());
        cache.store(k(0, 1), Some(1.0.into()), set(&[k(0, 0)]), FxHashSet::default());
        assert_eq!(cache.plain_snapshot_count(), 1);

        // re-read with the same input keeps the snapshot
        cache.store(k(0, 1), Some(1.0.into()), set(&[k(0, 0)]), FxHashSet::default());
        assert!(cache.plain_value(&k(0, 0)).is_some());

        // the last reader moves elsewhere
        cache.record_plain(k(7, 7), 2.0.into());
        cache.store(k(0, 1), Some(2.0.into()), set(&[k(7, 7)]), FxHashSet::default());
        assert!(cache.plain_value(&k(0, 0)).is_none());
        assert_eq!(cache.plain_snapshot_count(), 1);

        cache.remove(&k(0, 1));
        assert_eq!(cache.plain_snapshot_count(), 0);

        // edits of unread cells are not remembered
        cache.refresh_plain(k(9, 9), 3.0.into());
        assert!(cache.plain_value(&k(9, 9)).is_none());
    }
}
