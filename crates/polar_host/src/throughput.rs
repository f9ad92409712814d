use crate::channel::{AwgnChannel, sigma_from_ebn0};
use crate::link::{Link, Worker};
use crate::stats::LinkStats;
use anyhow::{Result, ensure};
use polar_io::loader;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Seed of the noise generator used for frame `index`.
///
/// Every frame gets its own generator so results do not depend on how rayon
/// splits the work.
pub fn frame_seed(seed: u64, index: u64) -> u64 {
    seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Decodes every frame of a .b8 file through BPSK/AWGN in parallel.
///
/// Each rayon worker owns one decoder and its buffers; the mask is shared.
pub fn run_benchmark(link: &Link, frames_path: &Path, ebn0_db: f64, seed: u64) -> Result<LinkStats> {
    println!("Loading Frames from {}...", frames_path.display());
    let raw_bits = loader::load_b8_file(frames_path)?;
    let frames = loader::slice_frames(&raw_bits, link.k());
    ensure!(!frames.is_empty(), "no complete {}-bit frame in {}", link.k(), frames_path.display());
    println!("Loaded {} frames.", frames.len());

    let sigma = sigma_from_ebn0(ebn0_db, link.rate());
    let channel = AwgnChannel::new(sigma)?;
    info!(ebn0_db, sigma, n = link.n(), k = link.k(), "starting benchmark");

    println!("Starting Benchmark (Parallel - Rayon)...");
    let start_bench = Instant::now();

    let stats = frames
        .par_iter()
        .enumerate()
        .map_init(
            || Worker::new(link),
            |worker, (i, frame)| {
                let mut rng = StdRng::seed_from_u64(frame_seed(seed, i as u64));
                worker.run_frame(frame, &channel, &mut rng)
            },
        )
        .try_fold(LinkStats::default, |stats, report| Ok::<_, anyhow::Error>(stats.record(report?)))
        .try_reduce(LinkStats::default, |a, b| Ok(a.merge(b)))?;

    let seconds = start_bench.elapsed().as_secs_f64();
    let throughput = frames.len() as f64 / seconds;

    println!("Results");
    println!("Time: {:.4} s", seconds);
    println!("Throughput: {:.2} frames/s ({:.2} Mbit/s)", throughput, throughput * link.payload_len() as f64 / 1e6);
    println!("Eb/N0: {:.2} dB (sigma = {:.4})", ebn0_db, sigma);
    println!(
        "Frame errors: {}/{} (FER = {:.3e})",
        stats.frame_errors, stats.frames, stats.fer()
    );
    println!("Bit errors: {} (BER = {:.3e})", stats.bit_errors, stats.ber(link.payload_len()));
    if link.crc.is_some() {
        println!(
            "Avg attempts: {:.3}, recovered by flip: {}, detected failures: {}",
            stats.avg_attempts(),
            stats.flip_recoveries,
            stats.detected_failures
        );
    }
    stats.latency.print_report();

    Ok(stats)
}
