use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

pub const DEFAULT_PAGE_SIZE: u64 = 4096;
pub const DEFAULT_NUM_FRAMES: usize = 4;
pub const DEFAULT_PAGEIN_LATENCY: u64 = 10;
pub const DEFAULT_TLB_SIZE: usize = 16;

/// Free-block selection policy of the heap allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStrategy {
    FirstFit,
    BestFit,
    WorstFit,
}

impl FitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstFit => "first_fit",
            Self::BestFit => "best_fit",
            Self::WorstFit => "worst_fit",
        }
    }
}

impl FromStr for FitStrategy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_fit" => Ok(Self::FirstFit),
            "best_fit" => Ok(Self::BestFit),
            "worst_fit" => Ok(Self::WorstFit),
            other => Err(SimError::InvalidConfig(format!(
                "fit strategy must be first_fit, best_fit, or worst_fit, not {other:?}"
            ))),
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub page_size: u64,
    pub num_frames: usize,
    pub pagein_latency: u64,
    pub tlb_size: usize,
    pub fit: FitStrategy,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            page_size: DEFAULT_PAGE_SIZE,
            num_frames: DEFAULT_NUM_FRAMES,
            pagein_latency: DEFAULT_PAGEIN_LATENCY,
            tlb_size: DEFAULT_TLB_SIZE,
            fit: FitStrategy::FirstFit,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(SimError::InvalidConfig(format!(
                "page size is {} but must be a power of 2",
                self.page_size
            )));
        }
        if self.num_frames == 0 {
            return Err(SimError::InvalidConfig(
                "number of frames must be at least 1".into(),
            ));
        }
        if self.tlb_size == 0 {
            return Err(SimError::InvalidConfig(
                "translation cache capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for SimConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Each page contains {} bytes.", self.page_size)?;
        writeln!(f, "Physical memory contains {} frames.", self.num_frames)?;
        writeln!(f, "A page-in completes after {} cycles.", self.pagein_latency)?;
        writeln!(
            f,
            "The translation cache holds {} entries.",
            self.tlb_size
        )?;
        writeln!(f, "The heap allocator uses the {} strategy.", self.fit)?;
        Ok(())
    }
}
