//! Monte-Carlo bit/frame error rate sweep over Eb/N0.

use crate::KernelKind;
use crate::channel::{AwgnChannel, matched_erasure_probability, sigma_from_ebn0};
use crate::link::{Link, Worker};
use crate::stats::LinkStats;
use crate::throughput::frame_seed;
use anyhow::{Context, Result, ensure};
use polar_common::construction::Method;
use polar_core::Construction;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Frames decoded between two checks of the frame-error target.
const BATCH: u64 = 1024;

/// Parameters of a sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub n: usize,
    pub k: usize,
    pub method: Method,
    /// Fixed construction noise. When absent, noise-driven constructions
    /// are rebuilt at every point from that point's sigma.
    pub noise: Option<f64>,
    pub path: Option<PathBuf>,
    pub crc: Option<String>,
    pub n_flips: usize,
    pub kernel: KernelKind,
    pub min_ebn0: f64,
    pub max_ebn0: f64,
    pub step: f64,
    pub max_frames: u64,
    /// Stop a point early once this many frame errors were seen.
    pub max_fe: Option<u64>,
    pub seed: u64,
}

/// Result of one Eb/N0 point.
#[derive(Debug, Clone, Copy)]
pub struct SweepPoint {
    pub ebn0_db: f64,
    pub sigma: f64,
    pub stats: LinkStats,
    pub seconds: f64,
}

impl SweepPoint {
    /// One row of the sweep table, BER counted over `payload_len` bits.
    pub fn row(&self, payload_len: usize) -> String {
        format!(
            "  {:>7.2} {:>8.4} {:>9} {:>7} {:>9} {:>10.3e} {:>10.3e} {:>8.3} {:>9.0}",
            self.ebn0_db,
            self.sigma,
            self.stats.frames,
            self.stats.frame_errors,
            self.stats.bit_errors,
            self.stats.fer(),
            self.stats.ber(payload_len),
            self.stats.avg_attempts(),
            self.stats.frames as f64 / self.seconds.max(f64::EPSILON)
        )
    }
}

impl SweepConfig {
    /// Eb/N0 values of the sweep, both bounds included.
    pub fn points(&self) -> Result<Vec<f64>> {
        ensure!(self.step > 0.0, "Eb/N0 step must be positive, got {}", self.step);
        ensure!(
            self.max_ebn0 >= self.min_ebn0,
            "empty Eb/N0 range [{}, {}]",
            self.min_ebn0,
            self.max_ebn0
        );
        let count = ((self.max_ebn0 - self.min_ebn0) / self.step + 1e-9).floor() as usize + 1;
        Ok((0..count).map(|i| self.min_ebn0 + i as f64 * self.step).collect())
    }

    /// Construction noise to use at a point of standard deviation `sigma`.
    fn construction_noise(&self, sigma: f64) -> Option<f64> {
        match (self.noise, self.method) {
            (Some(noise), _) => Some(noise),
            (None, Method::ErasureChannel) => Some(matched_erasure_probability(sigma)),
            (None, method) if method.uses_noise() => Some(sigma),
            (None, _) => None,
        }
    }

    fn build_link(&self, sigma: f64) -> Result<Link> {
        let construction: Construction = polar_io::construction::resolve(
            self.method,
            self.n,
            self.construction_noise(sigma),
            self.path.as_deref(),
        )?;
        Link::new(
            self.n,
            self.k,
            &construction,
            self.crc.as_deref(),
            self.n_flips,
            self.kernel,
        )
    }
}

/// Runs one point: batches of frames in parallel until `max_frames` frames
/// or `max_fe` frame errors.
pub fn simulate_point(link: &Link, channel: &AwgnChannel, cfg: &SweepConfig, point: u64) -> Result<LinkStats> {
    let mut total = LinkStats::default();
    let point_seed = frame_seed(cfg.seed, point.wrapping_add(1) << 40);

    while total.frames < cfg.max_frames {
        if cfg.max_fe.is_some_and(|max| total.frame_errors >= max) {
            break;
        }
        let first = total.frames;
        let last = (first + BATCH).min(cfg.max_frames);

        let batch = (first..last)
            .into_par_iter()
            .map_init(
                || (Worker::new(link), vec![0u8; link.k()]),
                |(worker, frame), i| {
                    let mut rng = StdRng::seed_from_u64(frame_seed(point_seed, i));
                    link.random_frame(&mut rng, frame)?;
                    worker.run_frame(frame.as_slice(), channel, &mut rng)
                },
            )
            .try_fold(LinkStats::default, |stats, report| Ok::<_, anyhow::Error>(stats.record(report?)))
            .try_reduce(LinkStats::default, |a, b| Ok(a.merge(b)))?;
        total = total.merge(batch);
    }

    Ok(total)
}

/// Runs the whole sweep and prints one table row per point.
pub fn run_sweep(cfg: &SweepConfig) -> Result<Vec<SweepPoint>> {
    let points = cfg.points()?;
    let adaptive = cfg.noise.is_none() && cfg.method.uses_noise();

    // a link built once serves every point when the mask does not track the noise
    let fixed = if adaptive {
        None
    } else {
        let sigma = sigma_from_ebn0(points[0], payload_rate(cfg)?);
        Some(cfg.build_link(sigma)?)
    };

    info!(
        n = cfg.n,
        k = cfg.k,
        method = cfg.method.name(),
        adaptive,
        points = points.len(),
        "starting sweep"
    );
    println!(
        "# Polar ({}, {}) {} construction, {} flips, CRC {}",
        cfg.n,
        cfg.k,
        cfg.method.name(),
        cfg.n_flips,
        cfg.crc.as_deref().unwrap_or("none")
    );
    println!("# {:>7} {:>8} {:>9} {:>7} {:>9} {:>10} {:>10} {:>8} {:>9}", "Eb/N0", "sigma", "FRA", "FE", "BE", "FER", "BER", "ATT", "FRA/s");

    let mut results = Vec::with_capacity(points.len());
    for (i, &ebn0_db) in points.iter().enumerate() {
        let rate = payload_rate(cfg)?;
        let sigma = sigma_from_ebn0(ebn0_db, rate);
        let channel = AwgnChannel::new(sigma)?;

        let rebuilt;
        let link = match &fixed {
            Some(link) => link,
            None => {
                rebuilt = cfg
                    .build_link(sigma)
                    .with_context(|| format!("Failed to build the code at {:.2} dB", ebn0_db))?;
                debug!(ebn0_db, sigma, "mask rebuilt");
                &rebuilt
            }
        };

        let start = Instant::now();
        let stats = simulate_point(link, &channel, cfg, i as u64)?;
        let seconds = start.elapsed().as_secs_f64();

        let point = SweepPoint {
            ebn0_db,
            sigma: channel.sigma(),
            stats,
            seconds,
        };
        println!("{}", point.row(link.payload_len()));
        results.push(point);
    }

    Ok(results)
}

fn payload_rate(cfg: &SweepConfig) -> Result<f64> {
    let crc_bits = match cfg.crc.as_deref() {
        Some(poly) => polar_core::Crc::new(cfg.k, poly)
            .context("Failed to build the CRC")?
            .size(),
        None => 0,
    };
    Ok((cfg.k - crc_bits) as f64 / cfg.n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(method: Method) -> SweepConfig {
        SweepConfig {
            n: 64,
            k: 32,
            method,
            noise: None,
            path: None,
            crc: Some("8-DVB-S2".to_string()),
            n_flips: 4,
            kernel: KernelKind::MinSum,
            min_ebn0: 1.0,
            max_ebn0: 3.0,
            step: 1.0,
            max_frames: 300,
            max_fe: None,
            seed: 1,
        }
    }

    #[test]
    fn points_include_both_bounds() {
        let mut cfg = config(Method::ReliabilityTable);
        assert_eq!(cfg.points().unwrap(), vec![1.0, 2.0, 3.0]);
        cfg.step = 0.25;
        cfg.max_ebn0 = 1.5;
        assert_eq!(cfg.points().unwrap().len(), 3);
        cfg.step = 0.0;
        assert!(cfg.points().is_err());
    }

    #[test]
    fn adaptive_noise_follows_the_channel() {
        let cfg = config(Method::GaussianApproximation);
        assert_eq!(cfg.construction_noise(0.7), Some(0.7));
        let fixed = SweepConfig {
            noise: Some(0.5),
            ..config(Method::GaussianApproximation)
        };
        assert_eq!(fixed.construction_noise(0.7), Some(0.5));
        assert_eq!(config(Method::ReliabilityTable).construction_noise(0.7), None);
        let bec = config(Method::ErasureChannel).construction_noise(1.0).unwrap();
        assert!(bec > 0.0 && bec < 1.0);
    }

    #[test]
    fn rate_counts_payload_bits_only() {
        assert!((payload_rate(&config(Method::ReliabilityTable)).unwrap() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn frame_error_target_stops_a_point_early() {
        let cfg = SweepConfig {
            max_frames: 5_000,
            max_fe: Some(5),
            ..config(Method::ReliabilityTable)
        };
        let link = cfg.build_link(1.0).unwrap();
        // very noisy channel: nearly every frame fails
        let channel = AwgnChannel::new(3.0).unwrap();
        let stats = simulate_point(&link, &channel, &cfg, 0).unwrap();
        assert!(stats.frame_errors >= 5);
        assert!(stats.frames <= BATCH);
    }

    #[test]
    fn sweep_error_rates_drop_with_snr() {
        let cfg = SweepConfig {
            min_ebn0: 0.0,
            max_ebn0: 6.0,
            step: 6.0,
            max_frames: 400,
            ..config(Method::GaussianApproximation)
        };
        let points = run_sweep(&cfg).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.stats.frames == 400));
        assert!(points[1].stats.frame_errors < points[0].stats.frame_errors);
        assert!(points[0].sigma > points[1].sigma);
        assert!(points.iter().all(|p| p.seconds >= 0.0));
    }

    #[test]
    fn table_rows_come_from_the_point() {
        let point = SweepPoint {
            ebn0_db: 1.5,
            sigma: 0.75,
            stats: LinkStats {
                frames: 100,
                frame_errors: 10,
                bit_errors: 40,
                ..LinkStats::default()
            },
            seconds: 2.0,
        };
        let row = point.row(40);
        let fields: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(fields[0], "1.50");
        assert_eq!(fields[1], "0.7500");
        assert_eq!(fields[2], "100");
        assert_eq!(fields[3], "10");
        assert_eq!(fields[4], "40");
        assert_eq!(fields[5], "1.000e-1");
        assert_eq!(fields[6], "1.000e-2");
        assert_eq!(fields[8], "50");
    }
}
