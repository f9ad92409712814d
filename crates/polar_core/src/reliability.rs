//! Reliability ranking of polar bit-channels.
//!
//! Every construction method reduces to a score per bit-channel; the ranking
//! sorts channels by ascending score, breaking ties by ascending index, so
//! the result is a strict total order and frozen-set construction is fully
//! deterministic. Index 0 always ends up among the least reliable channels
//! because it sits on the "bad" branch at every level of the polarization
//! recursion.

use crate::frozen::{FrozenMask, check_size};
use crate::{PolarError, Result};
use polar_common::construction::Method;
use polar_common::reliability::{MAX_TABLE_LEN, SEQUENCE_5G};

// Two-piece approximation of the Gaussian-approximation phi function. The
// pieces meet at PHI_PIVOT, where both evaluate to exp(-0.37896).
const PHI_ALPHA: f64 = -0.4527;
const PHI_BETA: f64 = 0.0218;
const PHI_GAMMA: f64 = 0.86;
const PHI_PIVOT: f64 = 0.867861;
const PHI_QUAD_A: f64 = 0.0564;
const PHI_QUAD_B: f64 = -0.4856;

/// Selects a construction method together with its input.
///
/// Noise-driven methods carry their noise scalar; file-driven methods carry
/// the data already loaded by the caller (see the `polar_io` crate). The
/// standardized table needs nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Construction {
    /// Gaussian approximation for an AWGN channel with noise standard
    /// deviation `sigma`.
    GaussianApproximation { sigma: f64 },

    /// Standardized 5G reliability sequence, restricted to indices below N.
    ReliabilityTable,

    /// Per-channel error-probability bounds, one per index. Lower is more
    /// reliable.
    ErrorBounds(Vec<f64>),

    /// Binary erasure channel with the given erasure probability.
    ErasureChannel { erasure_probability: f64 },

    /// Explicit channel order, most reliable first.
    ChannelOrder(Vec<usize>),
}

impl Construction {
    /// Identifier of the method this construction uses.
    pub fn method(&self) -> Method {
        match self {
            Construction::GaussianApproximation { .. } => Method::GaussianApproximation,
            Construction::ReliabilityTable => Method::ReliabilityTable,
            Construction::ErrorBounds(_) => Method::ErrorBounds,
            Construction::ErasureChannel { .. } => Method::ErasureChannel,
            Construction::ChannelOrder(_) => Method::ChannelOrder,
        }
    }
}

/// Permutation of `[0, N)` from the least to the most reliable bit-channel.
///
/// Ranking is the expensive part of code construction (up to O(N log N) for
/// the analytic methods, plus file access for the external ones). Keeping the
/// ranking around makes a change of K a cheap re-threshold through
/// [`ReliabilityOrder::threshold`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReliabilityOrder {
    order: Vec<usize>,
}

impl ReliabilityOrder {
    /// Ranks the N bit-channels with the given construction.
    ///
    /// # Arguments
    ///
    /// * `n` - Code length, must be a power of two
    /// * `construction` - Method and its input
    ///
    /// # Returns
    ///
    /// The ranking, or `InvalidSize`, `InvalidNoise`, `TableTooShort` or
    /// `MalformedResource` when the inputs cannot produce one.
    pub fn rank(n: usize, construction: &Construction) -> Result<Self> {
        check_size(n)?;

        let order = match construction {
            Construction::GaussianApproximation { sigma } => {
                let sigma = *sigma;
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(PolarError::InvalidNoise {
                        method: Method::GaussianApproximation.name(),
                        value: sigma,
                    });
                }
                order_by_score(&gaussian_approximation(n, sigma))
            }
            Construction::ReliabilityTable => table_order(n)?,
            Construction::ErrorBounds(bounds) => {
                if bounds.len() != n {
                    return Err(PolarError::MalformedResource(format!(
                        "expected {} error bounds, found {}",
                        n,
                        bounds.len()
                    )));
                }
                if let Some(bad) = bounds.iter().position(|b| !(b.is_finite() && *b >= 0.0)) {
                    return Err(PolarError::MalformedResource(format!(
                        "error bound of channel {} is {}",
                        bad, bounds[bad]
                    )));
                }
                let scores: Vec<f64> = bounds.iter().map(|b| -b).collect();
                order_by_score(&scores)
            }
            Construction::ErasureChannel {
                erasure_probability,
            } => {
                let eps = *erasure_probability;
                if !(eps > 0.0 && eps < 1.0) {
                    return Err(PolarError::InvalidNoise {
                        method: Method::ErasureChannel.name(),
                        value: eps,
                    });
                }
                let scores: Vec<f64> = erasure_probabilities(n, eps).iter().map(|z| -z).collect();
                order_by_score(&scores)
            }
            Construction::ChannelOrder(best_first) => {
                check_permutation(best_first, n)?;
                best_first.iter().rev().copied().collect()
            }
        };

        Ok(Self { order })
    }

    /// Wraps an existing least-reliable-first permutation.
    pub fn from_order(order: Vec<usize>) -> Result<Self> {
        check_size(order.len())?;
        check_permutation(&order, order.len())?;
        Ok(Self { order })
    }

    /// Code length covered by the ranking.
    pub fn n(&self) -> usize {
        self.order.len()
    }

    /// Channel indices, least reliable first.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    /// Freezes the N - K least reliable channels.
    ///
    /// Does not re-rank, so re-thresholding the same ranking for another K
    /// only costs O(N).
    ///
    /// # Arguments
    ///
    /// * `k` - Number of information bits, in `1..=N`
    pub fn threshold(&self, k: usize) -> Result<FrozenMask> {
        let n = self.order.len();
        if k == 0 || k > n {
            return Err(PolarError::InvalidRate { k, n });
        }
        let mut frozen = vec![false; n];
        for &idx in &self.order[..n - k] {
            frozen[idx] = true;
        }
        FrozenMask::from_bits(frozen)
    }
}

/// Sorts indices by ascending score, ties by ascending index.
fn order_by_score(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(core::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

fn check_permutation(order: &[usize], n: usize) -> Result<()> {
    if order.len() != n {
        return Err(PolarError::MalformedResource(format!(
            "expected {} channel indices, found {}",
            n,
            order.len()
        )));
    }
    let mut seen = vec![false; n];
    for &idx in order {
        if idx >= n {
            return Err(PolarError::MalformedResource(format!(
                "channel index {} out of range for N = {}",
                idx, n
            )));
        }
        if seen[idx] {
            return Err(PolarError::MalformedResource(format!(
                "channel index {} listed twice",
                idx
            )));
        }
        seen[idx] = true;
    }
    Ok(())
}

fn table_order(n: usize) -> Result<Vec<usize>> {
    if n > MAX_TABLE_LEN {
        return Err(PolarError::TableTooShort {
            n,
            max: MAX_TABLE_LEN,
        });
    }
    Ok(SEQUENCE_5G
        .iter()
        .map(|&idx| idx as usize)
        .filter(|&idx| idx < n)
        .collect())
}

/// Runs the channel-splitting recursion from a single seed value.
///
/// At level `l` every block of `N >> (l - 1)` entries splits into a "bad"
/// child at the block start and a "good" child half a block further, which
/// is the order in which SC decoding visits the children.
fn polarize(n: usize, seed: f64, bad: impl Fn(f64) -> f64, good: impl Fn(f64) -> f64) -> Vec<f64> {
    let mut z = vec![seed; n];
    let m = n.trailing_zeros() as usize;
    for l in 1..=m {
        let block = n >> (l - 1);
        let half = n >> l;
        for t in 0..(1usize << (l - 1)) {
            let parent = z[t * block];
            z[t * block] = bad(parent);
            z[t * block + half] = good(parent);
        }
    }
    z
}

/// Mean LLR of every bit-channel under the Gaussian approximation.
pub(crate) fn gaussian_approximation(n: usize, sigma: f64) -> Vec<f64> {
    polarize(n, 2.0 / (sigma * sigma), ga_check_node, |t| 2.0 * t)
}

/// Erasure probability of every bit-channel of a BEC(eps).
pub(crate) fn erasure_probabilities(n: usize, eps: f64) -> Vec<f64> {
    polarize(n, eps, |z| 2.0 * z - z * z, |z| z * z)
}

/// Check-node update `phi^-1(1 - (1 - phi(t))^2)`, in the log domain.
fn ga_check_node(t: f64) -> f64 {
    let ln_p = ln_phi(t);
    // 1 - (1 - p)^2 = p (2 - p)
    let ln_y = ln_p + (2.0 - ln_p.exp()).ln();
    phi_inv_from_ln(ln_y)
}

fn ln_phi(t: f64) -> f64 {
    if t < PHI_PIVOT {
        PHI_QUAD_A * t * t + PHI_QUAD_B * t
    } else {
        PHI_ALPHA * t.powf(PHI_GAMMA) + PHI_BETA
    }
}

fn phi_inv_from_ln(ln_y: f64) -> f64 {
    if ln_y > ln_phi(PHI_PIVOT) {
        let scale = -PHI_QUAD_B / (2.0 * PHI_QUAD_A);
        let ratio = 4.0 * PHI_QUAD_A / (PHI_QUAD_B * PHI_QUAD_B);
        scale * (1.0 - (1.0 + ratio * ln_y).sqrt())
    } else {
        ((ln_y - PHI_BETA) / PHI_ALPHA).powf(1.0 / PHI_GAMMA)
    }
}
