//! Replays allocator traces and prints where the free space ended up.
//!
//! ```text
//! replay <trace.json>
//! replay --random <seed> [op count]
//! ```
//!
//! Set `RUST_LOG=debug` to see the outcome of every operation.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use offset_allocator::{
    trace::{Replay, Trace},
    StorageRegion, StorageReport,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

const RANDOM_SIZE: u32 = 64 * 1024 * 1024;
const RANDOM_MAX_ALLOCS: u32 = 4096;
const RANDOM_MAX_ALLOC_SIZE: u32 = 256 * 1024;
const RANDOM_DEFAULT_OPS: usize = 100_000;

#[derive(Serialize)]
struct Summary {
    ops: usize,
    failed: usize,
    live: usize,
    report: StorageReport,
    free_regions: Vec<StorageRegion>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let trace = match args.next().as_deref() {
        Some("--random") => {
            let seed = args
                .next()
                .context("missing seed")?
                .parse()
                .context("seed must be an integer")?;
            let op_count = match args.next() {
                Some(count) => count.parse().context("op count must be an integer")?,
                None => RANDOM_DEFAULT_OPS,
            };
            log::info!("generating {op_count} random ops with seed {seed}");
            Trace::random(
                &mut StdRng::seed_from_u64(seed),
                RANDOM_SIZE,
                RANDOM_MAX_ALLOCS,
                op_count,
                RANDOM_MAX_ALLOC_SIZE,
            )?
        }
        Some(path) => load_trace(Path::new(path))?,
        None => anyhow::bail!("usage: replay <trace.json> | replay --random <seed> [op count]"),
    };

    let start = std::time::Instant::now();
    let replay = trace.replay()?;
    log::info!(
        "replayed {} ops in {:.3}ms",
        trace.ops.len(),
        start.elapsed().as_secs_f64() * 1000.
    );

    if let Some((a, b)) = replay.find_overlap() {
        anyhow::bail!("live allocations {a:?} and {b:?} overlap");
    }

    println!("{}", serde_json::to_string_pretty(&summarize(&replay))?);
    Ok(())
}

fn load_trace(path: &Path) -> anyhow::Result<Trace> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("could not parse trace {}", path.display()))
}

fn summarize(replay: &Replay) -> Summary {
    Summary {
        ops: replay.outcomes.len(),
        failed: replay.failure_count(),
        live: replay.live.len(),
        report: replay.allocator.storage_report(),
        free_regions: replay
            .allocator
            .storage_report_full()
            .iter_nonempty()
            .copied()
            .collect(),
    }
}
