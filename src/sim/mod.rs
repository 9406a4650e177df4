pub mod clock;
pub mod frame;
pub mod heap;
pub mod metrics;
pub mod mmu;
pub mod process;
pub mod sched;
pub mod tlb;

use log::{debug, info, warn};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::event::{Event, EventKind, EventQueue};
use crate::sim::clock::Clock;
use crate::sim::frame::FrameTable;
use crate::sim::metrics::Metrics;
use crate::sim::mmu::{AccessResult, Mmu};
use crate::sim::sched::Scheduler;

/// The event loop: pops events in deterministic key order, advances the
/// clock, and dispatches to the MMU, scheduler, and heap.
///
/// Error discipline follows the trace/programmer split: events with
/// missing or unparseable args are logged and skipped, while programmer
/// errors (duplicate or unknown pids, invalid frees) propagate out of
/// [`run`](Self::run) and abort the simulation.
pub struct Simulator {
    cfg: SimConfig,
    clock: Clock,
    queue: EventQueue,
    frames: FrameTable,
    mmu: Mmu,
    sched: Scheduler,
    metrics: Metrics,
    page_faults: u64,
}

impl Simulator {
    pub fn new(cfg: SimConfig) -> Self {
        Simulator {
            cfg,
            clock: Clock::new(),
            queue: EventQueue::new(),
            frames: FrameTable::new(cfg.num_frames),
            mmu: Mmu::new(cfg.page_size, cfg.tlb_size, cfg.fit),
            sched: Scheduler::new(),
            metrics: Metrics::new(),
            page_faults: 0,
        }
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    /// Runs until the event queue drains.
    pub fn run(&mut self) -> Result<(), SimError> {
        while !self.queue.is_empty() {
            let event = self.queue.pop()?;
            self.dispatch(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimError> {
        // time never rewinds; same-time events share the current cycle
        if event.key.time > self.clock.now() {
            self.clock.set(event.key.time);
        }

        match event.kind {
            EventKind::ProcStart => self.on_proc_start(&event),
            EventKind::ProcExit => self.on_proc_exit(&event),
            EventKind::Malloc => self.on_malloc(&event),
            EventKind::Free => self.on_free(&event),
            EventKind::Access => self.on_access(&event),
            EventKind::PageinComplete => self.on_pagein_complete(&event),
            _ => {
                debug!(
                    "[t={}] {} pid={} has no handler, ignored",
                    self.clock.now(),
                    event.kind.name(),
                    event.key.pid
                );
                Ok(())
            }
        }
    }

    fn on_proc_start(&mut self, event: &Event) -> Result<(), SimError> {
        let pid = event.key.pid;
        let (Some(heap_base), Some(heap_top)) = (arg_u64(event, 0), arg_u64(event, 1)) else {
            warn!("[t={}] PROC_START pid={} with bad args, skipped", self.clock.now(), pid);
            return Ok(());
        };
        if heap_top < heap_base {
            warn!(
                "[t={}] PROC_START pid={} heap_top {:#x} below heap_base {:#x}, skipped",
                self.clock.now(),
                pid,
                heap_top,
                heap_base
            );
            return Ok(());
        }

        self.mmu.register_process(pid, heap_base, heap_top - heap_base)?;
        self.sched.add_process(pid)?;
        info!("[t={}] PROC_START pid={}", self.clock.now(), pid);
        Ok(())
    }

    fn on_proc_exit(&mut self, event: &Event) -> Result<(), SimError> {
        let pid = event.key.pid;
        self.mmu.unregister_process(pid);
        self.sched.terminate_process(pid);
        info!("[t={}] PROC_EXIT pid={}", self.clock.now(), pid);
        Ok(())
    }

    fn on_malloc(&mut self, event: &Event) -> Result<(), SimError> {
        let pid = event.key.pid;
        let Some(size) = arg_u64(event, 0) else {
            warn!("[t={}] MALLOC pid={} with bad args, skipped", self.clock.now(), pid);
            return Ok(());
        };

        let addr = self.mmu.process_mut(pid)?.heap_alloc(size);
        self.publish_heap(pid)?;
        match addr {
            Some(addr) => info!(
                "[t={}] MALLOC pid={} size={} -> addr={:#x}",
                self.clock.now(),
                pid,
                size,
                addr
            ),
            None => warn!(
                "[t={}] MALLOC pid={} size={} failed",
                self.clock.now(),
                pid,
                size
            ),
        }
        Ok(())
    }

    fn on_free(&mut self, event: &Event) -> Result<(), SimError> {
        let pid = event.key.pid;
        let Some(addr) = arg_u64(event, 0) else {
            warn!("[t={}] FREE pid={} with bad args, skipped", self.clock.now(), pid);
            return Ok(());
        };

        self.mmu.process_mut(pid)?.heap_free(addr)?;
        self.publish_heap(pid)?;
        info!("[t={}] FREE pid={} addr={:#x}", self.clock.now(), pid, addr);
        Ok(())
    }

    fn on_access(&mut self, event: &Event) -> Result<(), SimError> {
        let Some(vaddr) = arg_u64(event, 0) else {
            warn!("[t={}] ACCESS with bad args, skipped", self.clock.now());
            return Ok(());
        };

        // accesses are attributed to whichever process holds the CPU, not
        // to the pid column of the trace line
        let Some(running) = self.sched.schedule_next() else {
            debug!("[t={}] ACCESS with no runnable process, skipped", self.clock.now());
            return Ok(());
        };

        match self.mmu.access(running, vaddr, &mut self.metrics)? {
            AccessResult::Hit => {
                info!(
                    "[t={}] ACCESS pid={} vaddr={:#x} (hit)",
                    self.clock.now(),
                    running,
                    vaddr
                );
            }
            AccessResult::PageFault => {
                self.page_faults += 1;
                let vpn = self.mmu.vpn_from_vaddr(vaddr);

                self.mmu.process_mut(running)?.block_on_page(vpn);
                self.sched.block_current()?;

                let kind = EventKind::PageinComplete;
                let priority = kind.priority();
                self.queue.push_parts(
                    self.clock.now() + self.cfg.pagein_latency,
                    priority,
                    running,
                    kind,
                    vec![vpn.to_string()],
                    String::new(),
                );
                info!(
                    "[t={}] PAGE_FAULT pid={} vpn={} -> blocked",
                    self.clock.now(),
                    running,
                    vpn
                );
            }
        }
        Ok(())
    }

    fn on_pagein_complete(&mut self, event: &Event) -> Result<(), SimError> {
        let pid = event.key.pid;
        let Some(vpn) = arg_u64(event, 0) else {
            warn!(
                "[t={}] PAGEIN_COMPLETE pid={} with bad args, skipped",
                self.clock.now(),
                pid
            );
            return Ok(());
        };

        // the process may have exited while the page-in was in flight
        if !self.mmu.is_registered(pid) {
            warn!(
                "[t={}] PAGEIN_COMPLETE pid={} after exit, skipped",
                self.clock.now(),
                pid
            );
            return Ok(());
        }

        let frame_id = self
            .mmu
            .complete_pagein(&mut self.frames, pid, vpn, self.clock.now())?;
        self.mmu.process_mut(pid)?.clear_block();
        self.sched.wake_process(pid)?;
        info!(
            "[t={}] PAGEIN_COMPLETE pid={} vpn={} frame={} -> ready",
            self.clock.now(),
            pid,
            vpn,
            frame_id
        );
        Ok(())
    }

    fn publish_heap(&mut self, pid: u32) -> Result<(), SimError> {
        let heap = self.mmu.process(pid)?.heap();
        let (total, allocated, free, largest, internal) = (
            heap.total_heap_size(),
            heap.allocated_bytes(),
            heap.free_bytes(),
            heap.largest_free_block(),
            heap.internal_fragmentation(),
        );
        self.metrics.update_heap(total, allocated, free, largest, internal);
        Ok(())
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn sched(&self) -> &Scheduler {
        &self.sched
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn page_faults(&self) -> u64 {
        self.page_faults
    }
}

fn arg_u64(event: &Event, idx: usize) -> Option<u64> {
    event.args.get(idx).and_then(|s| crate::utils::parse_u64(s))
}
