use std::collections::HashMap;

use crate::config::FitStrategy;
use crate::error::SimError;
use crate::sim::heap::HeapAllocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Invalid entries are kept (rather than removed) so a once-mapped page
/// stays distinguishable from a never-mapped one; lookups treat both the
/// same.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub valid: bool,
    pub frame_id: usize,
}

/// A simulated process: page table, scheduling state, and its own heap.
pub struct Process {
    pid: u32,
    state: ProcessState,
    page_table: HashMap<u64, PageTableEntry>,
    blocked_vpn: Option<u64>,
    heap: HeapAllocator,
}

impl Process {
    pub fn new(pid: u32, heap_base: u64, heap_size: u64, fit: FitStrategy) -> Self {
        Process {
            pid,
            state: ProcessState::New,
            page_table: HashMap::new(),
            blocked_vpn: None,
            heap: HeapAllocator::new(heap_base, heap_size, fit),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    pub fn has_mapping(&self, vpn: u64) -> bool {
        self.page_table.get(&vpn).is_some_and(|pte| pte.valid)
    }

    /// Returns the entry for `vpn`, or a default invalid one when absent.
    pub fn get_pte(&self, vpn: u64) -> PageTableEntry {
        self.page_table.get(&vpn).copied().unwrap_or_default()
    }

    pub fn map_page(&mut self, vpn: u64, frame_id: usize) {
        self.page_table.insert(
            vpn,
            PageTableEntry {
                valid: true,
                frame_id,
            },
        );
    }

    pub fn unmap_page(&mut self, vpn: u64) {
        if let Some(pte) = self.page_table.get_mut(&vpn) {
            pte.valid = false;
        }
    }

    pub fn clear_page_table(&mut self) {
        self.page_table.clear();
    }

    /// Valid mappings, for invariant checks and eager reclamation.
    pub fn mappings(&self) -> impl Iterator<Item = (u64, usize)> + '_ {
        self.page_table
            .iter()
            .filter(|(_, pte)| pte.valid)
            .map(|(&vpn, pte)| (vpn, pte.frame_id))
    }

    pub fn block_on_page(&mut self, vpn: u64) {
        self.blocked_vpn = Some(vpn);
        self.state = ProcessState::Blocked;
    }

    /// Resets the blocked page only; the state transition is the
    /// scheduler's call.
    pub fn clear_block(&mut self) {
        self.blocked_vpn = None;
    }

    pub fn is_blocked(&self) -> bool {
        self.state == ProcessState::Blocked
    }

    pub fn blocked_vpn(&self) -> Option<u64> {
        self.blocked_vpn
    }

    pub fn heap_alloc(&mut self, size: u64) -> Option<u64> {
        self.heap.alloc(size)
    }

    pub fn heap_free(&mut self, addr: u64) -> Result<(), SimError> {
        self.heap.free(addr)
    }

    pub fn heap(&self) -> &HeapAllocator {
        &self.heap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process() -> Process {
        Process::new(1, 0x1000, 0x8000, FitStrategy::FirstFit)
    }

    #[test]
    fn mappings_are_absent_until_mapped() {
        let mut p = process();
        assert!(!p.has_mapping(3));
        assert_eq!(p.get_pte(3), PageTableEntry::default());

        p.map_page(3, 2);
        assert!(p.has_mapping(3));
        assert_eq!(p.get_pte(3).frame_id, 2);
    }

    #[test]
    fn unmap_keeps_an_invalid_entry() {
        let mut p = process();
        p.map_page(3, 2);
        p.unmap_page(3);
        assert!(!p.has_mapping(3));
        // the entry survives, distinguishable from never-mapped
        assert_eq!(p.get_pte(3).frame_id, 2);
        p.unmap_page(9); // never mapped; no-op
        assert_eq!(p.get_pte(9), PageTableEntry::default());
    }

    #[test]
    fn clear_page_table_forgets_everything() {
        let mut p = process();
        p.map_page(1, 0);
        p.map_page(2, 1);
        p.clear_page_table();
        assert_eq!(p.mappings().count(), 0);
        assert_eq!(p.get_pte(1), PageTableEntry::default());
    }

    #[test]
    fn blocking_records_the_faulted_page() {
        let mut p = process();
        p.block_on_page(7);
        assert!(p.is_blocked());
        assert_eq!(p.blocked_vpn(), Some(7));

        p.clear_block();
        assert_eq!(p.blocked_vpn(), None);
        // state is untouched; the scheduler owns that transition
        assert_eq!(p.state(), ProcessState::Blocked);
    }

    #[test]
    fn heap_calls_delegate_to_the_allocator() {
        let mut p = process();
        let addr = p.heap_alloc(64).unwrap();
        assert_eq!(addr, 0x1000);
        assert_eq!(p.heap().allocated_bytes(), 64);
        p.heap_free(addr).unwrap();
        assert_eq!(p.heap().allocated_bytes(), 0);
        assert_eq!(p.heap_free(addr).unwrap_err(), SimError::InvalidFree(addr));
    }
}
