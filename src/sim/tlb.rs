use std::collections::VecDeque;

/// A cached virtual-to-physical translation, tagged by `(pid, vpn)`.
/// `referenced` is reserved for a CLOCK replacement variant; FIFO never
/// reads it.
#[derive(Debug, Clone, Copy)]
pub struct TlbEntry {
    pub pid: u32,
    pub vpn: u64,
    pub frame_id: usize,
    pub referenced: bool,
}

/// Bounded FIFO cache of translations. Purely a cache over page-table
/// state: it never allocates frames and never triggers faults. The front
/// of the deque is the oldest entry and the first to go when full.
pub struct TranslationCache {
    entries: VecDeque<TlbEntry>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        TranslationCache {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Linear scan; a hit does not reorder the queue (FIFO, not LRU).
    pub fn lookup(&mut self, pid: u32, vpn: u64) -> Option<usize> {
        let found = self
            .entries
            .iter()
            .find(|e| e.pid == pid && e.vpn == vpn)
            .map(|e| e.frame_id);
        match found {
            Some(frame_id) => {
                self.hits += 1;
                Some(frame_id)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a translation. An existing entry with the same tag is
    /// updated in place without changing its queue position.
    pub fn insert(&mut self, pid: u32, vpn: u64, frame_id: usize) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.pid == pid && e.vpn == vpn)
        {
            entry.frame_id = frame_id;
            return;
        }

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TlbEntry {
            pid,
            vpn,
            frame_id,
            referenced: false,
        });
    }

    /// Drops every entry owned by `pid`, keeping the survivors in order.
    pub fn flush_process(&mut self, pid: u32) {
        self.entries.retain(|e| e.pid != pid);
    }

    /// Drops the single entry for `(pid, vpn)`, if present.
    pub fn invalidate(&mut self, pid: u32, vpn: u64) {
        if let Some(idx) = self
            .entries
            .iter()
            .position(|e| e.pid == pid && e.vpn == vpn)
        {
            self.entries.remove(idx);
        }
    }

    /// Empties the cache. Hit and miss counters survive.
    pub fn flush_all(&mut self) {
        self.entries.clear();
    }

    /// Membership check that does not disturb the hit/miss counters.
    pub fn contains(&self, pid: u32, vpn: u64) -> bool {
        self.entries.iter().any(|e| e.pid == pid && e.vpn == vpn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_counts_hits_and_misses() {
        let mut tlb = TranslationCache::new(4);
        assert_eq!(tlb.lookup(1, 10), None);
        tlb.insert(1, 10, 0);
        assert_eq!(tlb.lookup(1, 10), Some(0));
        assert_eq!(tlb.lookup(2, 10), None);
        assert_eq!(tlb.hits(), 1);
        assert_eq!(tlb.misses(), 2);
        assert!((tlb.hit_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn full_cache_drops_the_oldest_entry() {
        let mut tlb = TranslationCache::new(2);
        tlb.insert(1, 10, 0);
        tlb.insert(1, 11, 1);
        tlb.insert(1, 12, 2);
        assert_eq!(tlb.len(), 2);
        assert!(!tlb.contains(1, 10));
        assert!(tlb.contains(1, 11));
        assert!(tlb.contains(1, 12));
    }

    #[test]
    fn a_hit_does_not_refresh_fifo_position() {
        let mut tlb = TranslationCache::new(2);
        tlb.insert(1, 10, 0);
        tlb.insert(1, 11, 1);
        // touching the oldest entry must not save it from eviction
        assert_eq!(tlb.lookup(1, 10), Some(0));
        tlb.insert(1, 12, 2);
        assert!(!tlb.contains(1, 10));
    }

    #[test]
    fn reinsert_updates_in_place_without_eviction() {
        let mut tlb = TranslationCache::new(2);
        tlb.insert(1, 10, 0);
        tlb.insert(1, 11, 1);
        tlb.insert(1, 10, 3);
        assert_eq!(tlb.len(), 2);
        assert_eq!(tlb.lookup(1, 10), Some(3));
        // position unchanged: (1, 10) is still the oldest
        tlb.insert(1, 12, 2);
        assert!(!tlb.contains(1, 10));
        assert!(tlb.contains(1, 11));
    }

    #[test]
    fn flush_process_removes_only_that_pid() {
        let mut tlb = TranslationCache::new(4);
        tlb.insert(1, 10, 0);
        tlb.insert(2, 20, 1);
        tlb.insert(1, 11, 2);
        tlb.flush_process(1);
        assert_eq!(tlb.len(), 1);
        assert!(tlb.contains(2, 20));
    }

    #[test]
    fn invalidate_removes_a_single_tag() {
        let mut tlb = TranslationCache::new(4);
        tlb.insert(1, 10, 0);
        tlb.insert(1, 11, 1);
        tlb.invalidate(1, 10);
        tlb.invalidate(1, 99); // absent tags are fine
        assert!(!tlb.contains(1, 10));
        assert!(tlb.contains(1, 11));
    }

    #[test]
    fn flush_all_keeps_the_counters() {
        let mut tlb = TranslationCache::new(4);
        tlb.insert(1, 10, 0);
        tlb.lookup(1, 10);
        tlb.flush_all();
        assert!(tlb.is_empty());
        assert_eq!(tlb.hits(), 1);
        // everything misses after a full flush
        assert_eq!(tlb.lookup(1, 10), None);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut tlb = TranslationCache::new(3);
        for vpn in 0..50 {
            tlb.insert(1, vpn, vpn as usize);
            assert!(tlb.len() <= tlb.capacity());
        }
    }
}
