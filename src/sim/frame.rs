use crate::error::SimError;

/// One physical frame. When `occupied` is false the remaining fields are
/// meaningless.
#[derive(Debug, Default, Clone, Copy)]
pub struct Frame {
    pub occupied: bool,
    pub pid: u32,
    pub vpn: u64,
    pub last_used: u64,
}

/// The occupant displaced by an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    pub pid: u32,
    pub vpn: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameAlloc {
    pub frame_id: usize,
    pub evicted: Option<Victim>,
}

/// Fixed array of physical frames with LRU eviction.
pub struct FrameTable {
    frames: Vec<Frame>,
}

impl FrameTable {
    pub fn new(num_frames: usize) -> Self {
        FrameTable {
            frames: vec![Frame::default(); num_frames],
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Claims a frame for `(pid, vpn)`, preferring the lowest-indexed free
    /// frame and falling back to evicting the LRU occupant.
    pub fn allocate(&mut self, pid: u32, vpn: u64, now: u64) -> Result<FrameAlloc, SimError> {
        let (frame_id, evicted) = match self.frames.iter().position(|f| !f.occupied) {
            Some(id) => (id, None),
            None => {
                let id = self.find_lru().ok_or(SimError::NoFrame)?;
                let old = self.frames[id];
                (
                    id,
                    Some(Victim {
                        pid: old.pid,
                        vpn: old.vpn,
                    }),
                )
            }
        };

        self.frames[frame_id] = Frame {
            occupied: true,
            pid,
            vpn,
            last_used: now,
        };
        Ok(FrameAlloc { frame_id, evicted })
    }

    // Minimum last_used; the strict comparison keeps the lowest index on
    // ties.
    fn find_lru(&self) -> Option<usize> {
        let mut lru: Option<usize> = None;
        for (id, frame) in self.frames.iter().enumerate() {
            if !frame.occupied {
                continue;
            }
            match lru {
                Some(best) if frame.last_used >= self.frames[best].last_used => {}
                _ => lru = Some(id),
            }
        }
        lru
    }

    pub fn touch(&mut self, frame_id: usize, now: u64) -> Result<(), SimError> {
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or(SimError::FrameOutOfRange(frame_id))?;
        frame.last_used = now;
        Ok(())
    }

    pub fn free(&mut self, frame_id: usize) -> Result<(), SimError> {
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or(SimError::FrameOutOfRange(frame_id))?;
        *frame = Frame::default();
        Ok(())
    }

    pub fn frame(&self, frame_id: usize) -> Result<&Frame, SimError> {
        self.frames
            .get(frame_id)
            .ok_or(SimError::FrameOutOfRange(frame_id))
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}
