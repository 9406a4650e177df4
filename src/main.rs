use std::path::PathBuf;

use clap::Parser;

use memsim::config::{self, FitStrategy, SimConfig};
use memsim::sim::Simulator;
use memsim::trace;

/// Virtual-memory subsystem simulator driven by a CSV event trace.
#[derive(Debug, Parser)]
#[command(name = "memsim")]
struct Opts {
    /// Path to the trace file.
    trace: PathBuf,

    /// Bytes per page (power of two).
    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE)]
    page_size: u64,

    /// Number of physical frames.
    #[arg(long, default_value_t = config::DEFAULT_NUM_FRAMES)]
    num_frames: usize,

    /// Cycles between a page fault and its page-in completion.
    #[arg(long, default_value_t = config::DEFAULT_PAGEIN_LATENCY)]
    pagein_latency: u64,

    /// Translation-cache capacity.
    #[arg(long, default_value_t = config::DEFAULT_TLB_SIZE)]
    tlb_size: usize,

    /// Heap fit strategy: first_fit, best_fit, or worst_fit.
    #[arg(long, default_value = "first_fit")]
    fit: FitStrategy,
}

fn main() -> Result<(), anyhow::Error> {
    init_logging();

    let opts = Opts::parse();
    let cfg = SimConfig {
        page_size: opts.page_size,
        num_frames: opts.num_frames,
        pagein_latency: opts.pagein_latency,
        tlb_size: opts.tlb_size,
        fit: opts.fit,
    };
    cfg.validate()?;
    println!("{cfg}");

    let mut sim = Simulator::new(cfg);
    let count = trace::load_trace(&opts.trace, sim.queue_mut())?;
    println!("Loaded {} events from {}", count, opts.trace.display());
    println!();

    sim.run()?;

    println!();
    println!("Simulation complete");
    println!("Total page faults: {}", sim.page_faults());
    println!();
    print!("{}", sim.metrics());

    Ok(())
}

fn init_logging() {
    env_logger::builder()
        .format_timestamp(None)
        .format_module_path(false)
        .init();
}
