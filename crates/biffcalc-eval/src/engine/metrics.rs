//! Cache hit and miss counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts formula-cell cache lookups. A miss is one formula evaluated.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served from cache, `None` before any lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let (h, m) = (self.hits(), self.misses());
        (h + m > 0).then(|| h as f64 / (h + m) as f64)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_resets() {
        let m = CacheMetrics::new();
        assert_eq!(m.hit_rate(), None);
        m.record_miss();
        m.record_hit();
        m.record_hit();
        m.record_hit();
        assert_eq!((m.hits(), m.misses()), (3, 1));
        assert_eq!(m.hit_rate(), Some(0.75));
        m.reset();
        assert_eq!((m.hits(), m.misses()), (0, 0));
    }
}
