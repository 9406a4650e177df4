use std::fmt;

/// Simulation statistics collected across subsystems. Knows nothing about
/// the MMU, cache, or scheduler internals; they push values in.
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    total_heap: u64,
    allocated_bytes: u64,
    free_bytes: u64,
    largest_free_block: u64,
    internal_frag_bytes: u64,

    tlb_hits: u64,
    tlb_misses: u64,

    latencies: Vec<u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn reset(&mut self) {
        *self = Metrics::default();
    }

    pub fn update_heap(
        &mut self,
        total_heap: u64,
        allocated: u64,
        free: u64,
        largest_free: u64,
        internal_frag: u64,
    ) {
        self.total_heap = total_heap;
        self.allocated_bytes = allocated;
        self.free_bytes = free;
        self.largest_free_block = largest_free;
        self.internal_frag_bytes = internal_frag;
    }

    pub fn total_heap_size(&self) -> u64 {
        self.total_heap
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    pub fn largest_free_block(&self) -> u64 {
        self.largest_free_block
    }

    pub fn internal_fragmentation(&self) -> u64 {
        self.internal_frag_bytes
    }

    pub fn external_fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / self.free_bytes as f64
    }

    pub fn record_tlb_hit(&mut self) {
        self.tlb_hits += 1;
    }

    pub fn record_tlb_miss(&mut self) {
        self.tlb_misses += 1;
    }

    pub fn tlb_hits(&self) -> u64 {
        self.tlb_hits
    }

    pub fn tlb_misses(&self) -> u64 {
        self.tlb_misses
    }

    pub fn tlb_hit_rate(&self) -> f64 {
        let total = self.tlb_hits + self.tlb_misses;
        if total == 0 {
            return 0.0;
        }
        self.tlb_hits as f64 / total as f64
    }

    pub fn record_access_latency(&mut self, cycles: u64) {
        self.latencies.push(cycles);
    }

    pub fn latency_p50(&self) -> u64 {
        self.percentile(0.50)
    }

    pub fn latency_p90(&self) -> u64 {
        self.percentile(0.90)
    }

    pub fn latency_p99(&self) -> u64 {
        self.percentile(0.99)
    }

    fn percentile(&self, p: f64) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = (p * (sorted.len() - 1) as f64) as usize;
        sorted[idx]
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final heap metrics:")?;
        writeln!(f, "  allocated_bytes = {}", self.allocated_bytes)?;
        writeln!(f, "  free_bytes      = {}", self.free_bytes)?;
        writeln!(f, "  largest_free    = {}", self.largest_free_block)?;
        writeln!(f, "  internal_frag   = {}", self.internal_frag_bytes)?;
        writeln!(f, "  external_frag   = {:.3}", self.external_fragmentation())?;
        writeln!(f)?;
        writeln!(
            f,
            "Translation cache: {} hits, {} misses (hit rate {:.3})",
            self.tlb_hits,
            self.tlb_misses,
            self.tlb_hit_rate()
        )?;
        writeln!(
            f,
            "Access latency: p50={} p90={} p99={} cycles",
            self.latency_p50(),
            self.latency_p90(),
            self.latency_p99()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_gauges_overwrite() {
        let mut m = Metrics::new();
        m.update_heap(1024, 256, 768, 512, 4);
        assert_eq!(m.total_heap_size(), 1024);
        assert_eq!(m.allocated_bytes(), 256);
        assert_eq!(m.free_bytes(), 768);
        assert_eq!(m.largest_free_block(), 512);
        assert_eq!(m.internal_fragmentation(), 4);
        assert!((m.external_fragmentation() - (1.0 - 512.0 / 768.0)).abs() < 1e-12);

        m.update_heap(1024, 1024, 0, 0, 0);
        assert_eq!(m.external_fragmentation(), 0.0);
    }

    #[test]
    fn hit_rate_handles_the_empty_case() {
        let mut m = Metrics::new();
        assert_eq!(m.tlb_hit_rate(), 0.0);
        m.record_tlb_hit();
        m.record_tlb_hit();
        m.record_tlb_miss();
        assert!((m.tlb_hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn percentiles_index_the_sorted_samples() {
        let mut m = Metrics::new();
        assert_eq!(m.latency_p50(), 0);

        // recorded out of order on purpose
        for cycles in [9, 2, 7, 4, 5, 6, 3, 8, 1, 10] {
            m.record_access_latency(cycles);
        }
        // index = p * (n - 1), truncated: 4.5 -> 4, 8.1 -> 8, 8.91 -> 8
        assert_eq!(m.latency_p50(), 5);
        assert_eq!(m.latency_p90(), 9);
        assert_eq!(m.latency_p99(), 9);
    }

    #[test]
    fn reset_clears_everything() {
        let mut m = Metrics::new();
        m.update_heap(8, 8, 0, 0, 0);
        m.record_tlb_hit();
        m.record_access_latency(5);
        m.reset();
        assert_eq!(m.total_heap_size(), 0);
        assert_eq!(m.tlb_hits(), 0);
        assert_eq!(m.latency_p99(), 0);
    }
}
