use std::collections::{HashMap, VecDeque};

use crate::error::SimError;
use crate::sim::process::ProcessState;

/// Cooperative single-running-process scheduler with a FIFO ready queue.
/// A running process keeps the CPU until it blocks or terminates; there is
/// no time slicing.
pub struct Scheduler {
    ready_queue: VecDeque<u32>,
    states: HashMap<u32, ProcessState>,
    current: Option<u32>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            ready_queue: VecDeque::new(),
            states: HashMap::new(),
            current: None,
        }
    }

    pub fn add_process(&mut self, pid: u32) -> Result<(), SimError> {
        if self.states.contains_key(&pid) {
            return Err(SimError::DuplicatePid(pid));
        }
        self.states.insert(pid, ProcessState::Ready);
        self.ready_queue.push_back(pid);
        Ok(())
    }

    pub fn terminate_process(&mut self, pid: u32) {
        self.states.insert(pid, ProcessState::Terminated);
        self.ready_queue.retain(|&p| p != pid);
        if self.current == Some(pid) {
            self.current = None;
        }
    }

    pub fn block_current(&mut self) -> Result<(), SimError> {
        let pid = self.current.take().ok_or(SimError::NothingRunning)?;
        self.states.insert(pid, ProcessState::Blocked);
        Ok(())
    }

    /// Wakes a blocked process. Waking a process in any other state is a
    /// spurious wake and is ignored.
    pub fn wake_process(&mut self, pid: u32) -> Result<(), SimError> {
        let state = self
            .states
            .get_mut(&pid)
            .ok_or(SimError::UnknownPid(pid))?;
        if *state != ProcessState::Blocked {
            return Ok(());
        }
        *state = ProcessState::Ready;
        self.ready_queue.push_back(pid);
        Ok(())
    }

    /// Returns the running process, promoting the first ready one in FIFO
    /// order when the CPU is idle. Stale queue entries (processes that
    /// blocked or terminated while queued) are skipped.
    pub fn schedule_next(&mut self) -> Option<u32> {
        if self.current.is_some() {
            return self.current;
        }

        while let Some(pid) = self.ready_queue.pop_front() {
            if self.states.get(&pid) == Some(&ProcessState::Ready) {
                self.states.insert(pid, ProcessState::Running);
                self.current = Some(pid);
                return self.current;
            }
        }
        None
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    pub fn has_runnable(&self) -> bool {
        self.current.is_some() || !self.ready_queue.is_empty()
    }

    pub fn state(&self, pid: u32) -> Option<ProcessState> {
        self.states.get(&pid).copied()
    }

    pub fn ready_len(&self) -> usize {
        self.ready_queue.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
