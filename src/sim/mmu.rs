use std::collections::HashMap;

use crate::config::FitStrategy;
use crate::error::SimError;
use crate::sim::frame::FrameTable;
use crate::sim::metrics::Metrics;
use crate::sim::process::Process;
use crate::sim::tlb::TranslationCache;

/// Access latencies in cycles. These feed the latency metrics and are part
/// of the observable contract.
pub const TLB_HIT_LATENCY: u64 = 1;
pub const PT_HIT_LATENCY: u64 = 5;
pub const FAULT_LATENCY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    PageFault,
}

/// Process registry plus the translation pipeline. Owns the translation
/// cache; the frame table is borrowed by the operations that mutate it.
pub struct Mmu {
    page_size: u64,
    fit: FitStrategy,
    tlb: TranslationCache,
    processes: HashMap<u32, Process>,
}

impl Mmu {
    pub fn new(page_size: u64, tlb_size: usize, fit: FitStrategy) -> Self {
        Mmu {
            page_size,
            fit,
            tlb: TranslationCache::new(tlb_size),
            processes: HashMap::new(),
        }
    }

    pub fn register_process(
        &mut self,
        pid: u32,
        heap_base: u64,
        heap_size: u64,
    ) -> Result<(), SimError> {
        if self.processes.contains_key(&pid) {
            return Err(SimError::DuplicatePid(pid));
        }
        self.processes
            .insert(pid, Process::new(pid, heap_base, heap_size, self.fit));
        Ok(())
    }

    /// Unknown pids are a no-op. Frames held by the process stay occupied;
    /// LRU pressure reclaims them lazily.
    pub fn unregister_process(&mut self, pid: u32) {
        if self.processes.remove(&pid).is_some() {
            self.tlb.flush_process(pid);
        }
    }

    pub fn is_registered(&self, pid: u32) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn process(&self, pid: u32) -> Result<&Process, SimError> {
        self.processes.get(&pid).ok_or(SimError::UnknownPid(pid))
    }

    pub fn process_mut(&mut self, pid: u32) -> Result<&mut Process, SimError> {
        self.processes
            .get_mut(&pid)
            .ok_or(SimError::UnknownPid(pid))
    }

    pub fn vpn_from_vaddr(&self, vaddr: u64) -> u64 {
        vaddr / self.page_size
    }

    /// The translation pipeline: cache, then page table, then fault. No
    /// frame is allocated here; the caller schedules the page-in
    /// completion.
    pub fn access(
        &mut self,
        pid: u32,
        vaddr: u64,
        metrics: &mut Metrics,
    ) -> Result<AccessResult, SimError> {
        let proc = self.processes.get(&pid).ok_or(SimError::UnknownPid(pid))?;
        let vpn = vaddr / self.page_size;

        if self.tlb.lookup(pid, vpn).is_some() {
            metrics.record_tlb_hit();
            metrics.record_access_latency(TLB_HIT_LATENCY);
            return Ok(AccessResult::Hit);
        }
        metrics.record_tlb_miss();

        if proc.has_mapping(vpn) {
            let pte = proc.get_pte(vpn);
            self.tlb.insert(pid, vpn, pte.frame_id);
            metrics.record_access_latency(PT_HIT_LATENCY);
            return Ok(AccessResult::Hit);
        }

        metrics.record_access_latency(FAULT_LATENCY);
        Ok(AccessResult::PageFault)
    }

    /// Resolves a fault by allocating a frame for `(pid, vpn)`. Eviction,
    /// invalidation of the victim's mapping and cache entry, and the new
    /// mapping happen as one step, so no intermediate event can observe a
    /// frame with two owners.
    pub fn complete_pagein(
        &mut self,
        frames: &mut FrameTable,
        pid: u32,
        vpn: u64,
        now: u64,
    ) -> Result<usize, SimError> {
        if !self.processes.contains_key(&pid) {
            return Err(SimError::UnknownPid(pid));
        }

        let alloc = frames.allocate(pid, vpn, now)?;

        if let Some(victim) = alloc.evicted {
            // The victim's owner may have exited already; its frames were
            // left behind as stale occupants.
            if let Some(owner) = self.processes.get_mut(&victim.pid) {
                owner.unmap_page(victim.vpn);
            }
            self.tlb.invalidate(victim.pid, victim.vpn);
        }

        let proc = self
            .processes
            .get_mut(&pid)
            .ok_or(SimError::UnknownPid(pid))?;
        proc.map_page(vpn, alloc.frame_id);
        self.tlb.insert(pid, vpn, alloc.frame_id);

        Ok(alloc.frame_id)
    }

    pub fn tlb(&self) -> &TranslationCache {
        &self.tlb
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }
}
