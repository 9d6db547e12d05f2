use std::collections::BTreeMap;
use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Row intervals of a sheet mapped to the values that cover them.
///
/// Intervals are grouped by their low end in a `BTreeMap`, so a stabbing
/// query only walks the intervals that start at or above the probed row.
#[derive(Debug, Clone)]
struct IntervalNode<T: Eq + Hash> {
    high: u32,
    values: FxHashSet<T>,
}

#[derive(Debug, Clone)]
pub struct IntervalTree<T: Eq + Hash> {
    map: BTreeMap<u32, Vec<IntervalNode<T>>>,
    size: usize,
}

impl<T: Eq + Hash> Default for IntervalTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> IntervalTree<T> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            size: 0,
        }
    }

    /// Number of distinct intervals.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn insert(&mut self, low: u32, high: u32, value: T) {
        let nodes = self.map.entry(low).or_default();
        if let Some(node) = nodes.iter_mut().find(|n| n.high == high) {
            node.values.insert(value);
        } else {
            let mut values = FxHashSet::default();
            values.insert(value);
            nodes.push(IntervalNode { high, values });
            self.size += 1;
        }
    }

    /// Removes `value` from `[low, high]`, dropping the interval once empty.
    pub fn remove(&mut self, low: u32, high: u32, value: &T) -> bool {
        let Some(nodes) = self.map.get_mut(&low) else {
            return false;
        };
        let Some(node) = nodes.iter_mut().find(|n| n.high == high) else {
            return false;
        };
        let removed = node.values.remove(value);
        if node.values.is_empty() {
            nodes.retain(|n| n.high != high);
            self.size -= 1;
        }
        if nodes.is_empty() {
            self.map.remove(&low);
        }
        removed
    }

    /// Values of every interval containing `point`.
    pub fn stab(&self, point: u32) -> impl Iterator<Item = &T> + '_ {
        self.map
            .range(..=point)
            .flat_map(|(_, nodes)| nodes.iter())
            .filter(move |n| n.high >= point)
            .flat_map(|n| n.values.iter())
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.size = 0;
    }
}
