//! Error-rate and latency statistics.
//!
//! Workers accumulate a [`LinkStats`] each and the partial results are
//! merged once the batch is done, so no counter is shared between threads.

use polar_core::{DecodeOutcome, FrameStatus};

const BUCKETS: usize = 20;
const BUCKET_NS: u64 = 10_000;

/// Tracks latency statistics with minimal overhead.
///
/// Keeps min, max, sum and a histogram of 10 microsecond buckets, the last
/// one open-ended.
#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub buckets: [u64; BUCKETS],
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            buckets: [0; BUCKETS],
        }
    }
}

impl LatencyStats {
    /// Records a latency measurement in nanoseconds.
    pub fn update(&mut self, nanos: u64) {
        self.min = self.min.min(nanos);
        self.max = self.max.max(nanos);
        self.sum += nanos;
        self.count += 1;

        let idx = (nanos / BUCKET_NS).min(BUCKETS as u64 - 1) as usize;
        self.buckets[idx] += 1;
    }

    pub fn merge(&mut self, other: &LatencyStats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
        for (a, b) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *a += b;
        }
    }

    /// Average latency in nanoseconds, 0.0 before the first measurement.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Prints count, min/avg/max and the non-empty histogram buckets.
    pub fn print_report(&self) {
        println!("\nLatency Metrics (Decode Time)");
        println!("Count: {}", self.count);
        if self.count == 0 {
            return;
        }

        let avg_ns = self.avg();
        if avg_ns < 1000.0 {
            println!("Min:   {:.2} ns", self.min as f64);
            println!("Avg:   {:.2} ns", avg_ns);
            println!("Max:   {:.2} ns", self.max as f64);
        } else {
            println!("Min:   {:.2} us", self.min as f64 / 1000.0);
            println!("Avg:   {:.2} us", avg_ns / 1000.0);
            println!("Max:   {:.2} us", self.max as f64 / 1000.0);
        }

        println!("Distribution (10us buckets):");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let range_end = if i == BUCKETS - 1 { ">" } else { "" };
                println!("[{:3}-{:3}{} us]: {}", i * 10, (i + 1) * 10, range_end, count);
            }
        }
    }
}

/// Per-frame result handed from the decode loop to the accumulator.
#[derive(Debug, Clone, Copy)]
pub struct FrameReport {
    pub bit_errors: u64,
    pub outcome: DecodeOutcome,
    pub latency_ns: u64,
}

/// Frame and bit error counters of a link.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
    pub frames: u64,
    pub frame_errors: u64,
    pub bit_errors: u64,
    /// SC passes over all frames.
    pub attempts: u64,
    /// Frames rejected by the integrity check after every attempt.
    pub detected_failures: u64,
    /// Frames accepted only after a flip.
    pub flip_recoveries: u64,
    pub latency: LatencyStats,
}

impl LinkStats {
    pub fn record(mut self, report: FrameReport) -> Self {
        self.frames += 1;
        self.bit_errors += report.bit_errors;
        if report.bit_errors > 0 {
            self.frame_errors += 1;
        }
        self.attempts += report.outcome.attempts as u64;
        if report.outcome.status == FrameStatus::Failed {
            self.detected_failures += 1;
        }
        if report.outcome.flipped.is_some() {
            self.flip_recoveries += 1;
        }
        self.latency.update(report.latency_ns);
        self
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.frames += other.frames;
        self.frame_errors += other.frame_errors;
        self.bit_errors += other.bit_errors;
        self.attempts += other.attempts;
        self.detected_failures += other.detected_failures;
        self.flip_recoveries += other.flip_recoveries;
        self.latency.merge(&other.latency);
        self
    }

    pub fn fer(&self) -> f64 {
        ratio(self.frame_errors, self.frames)
    }

    /// Bit error rate over `bits_per_frame` payload bits per frame.
    pub fn ber(&self, bits_per_frame: usize) -> f64 {
        ratio(self.bit_errors, self.frames * bits_per_frame as u64)
    }

    pub fn avg_attempts(&self) -> f64 {
        ratio(self.attempts, self.frames)
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Number of positions where `a` and `b` differ.
pub fn count_bit_errors(a: &[u8], b: &[u8]) -> u64 {
    a.iter().zip(b).filter(|(x, y)| x != y).count() as u64
}
