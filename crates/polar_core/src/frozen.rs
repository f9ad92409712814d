//! Frozen mask representation.
//!
//! The mask marks which of the N bit-channels carry information and which
//! are frozen to zero. It is built once per code configuration, never
//! mutated afterwards, and borrowed by the encoder and by every decoder
//! instance, so both ends of a simulated link always agree on it.

use crate::reliability::{Construction, ReliabilityOrder};
use crate::{PolarError, Result};
use core::fmt;
use tracing::debug;

/// Frozen/information partition of the N bit-channels.
///
/// Holds the N-entry boolean mask (true = frozen) together with the derived
/// list of information positions in ascending order. The invariant
/// `info_positions().len() == k()` and `frozen_count() == n() - k()` holds for
/// every instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenMask {
    /// One flag per bit-channel, true when the channel is frozen.
    ///
    /// Indexed by bit-channel, i.e. by leaf position of the decoding tree.
    frozen: Vec<bool>,

    /// Ascending indices of the non-frozen channels.
    ///
    /// Used to scatter information bits before encoding and to gather them
    /// back after decoding.
    info_positions: Vec<usize>,
}

impl FrozenMask {
    /// Ranks the bit-channels and freezes the N - K least reliable ones.
    ///
    /// # Arguments
    ///
    /// * `n` - Code length, a power of two
    /// * `k` - Number of information bits, in `1..=n`
    /// * `construction` - Reliability ranking method and its input
    ///
    /// # Returns
    ///
    /// The mask, or a configuration/resource error. Size and rate are
    /// checked before any ranking work is done.
    pub fn build(n: usize, k: usize, construction: &Construction) -> Result<Self> {
        check_size(n)?;
        if k == 0 || k > n {
            return Err(PolarError::InvalidRate { k, n });
        }
        let mask = ReliabilityOrder::rank(n, construction)?.threshold(k)?;
        debug!(
            n,
            k,
            method = construction.method().name(),
            "frozen mask constructed"
        );
        Ok(mask)
    }

    /// Wraps an explicit mask (true = frozen).
    ///
    /// The length must be a power of two and at least one channel must carry
    /// information.
    pub fn from_bits(frozen: Vec<bool>) -> Result<Self> {
        let n = frozen.len();
        check_size(n)?;
        let info_positions: Vec<usize> = frozen
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| if f { None } else { Some(i) })
            .collect();
        if info_positions.is_empty() {
            return Err(PolarError::InvalidRate { k: 0, n });
        }
        Ok(Self {
            frozen,
            info_positions,
        })
    }

    /// Code length N.
    #[inline(always)]
    pub fn n(&self) -> usize {
        self.frozen.len()
    }

    /// Number of information bits K.
    #[inline(always)]
    pub fn k(&self) -> usize {
        self.info_positions.len()
    }

    /// Number of frozen channels, N - K.
    pub fn frozen_count(&self) -> usize {
        self.n() - self.k()
    }

    /// Code rate K / N.
    pub fn rate(&self) -> f64 {
        self.k() as f64 / self.n() as f64
    }

    /// Whether bit-channel `i` is frozen.
    #[inline(always)]
    pub fn is_frozen(&self, i: usize) -> bool {
        self.frozen[i]
    }

    /// The mask as a slice, true = frozen.
    pub fn as_slice(&self) -> &[bool] {
        &self.frozen
    }

    /// Information positions in ascending order.
    #[inline(always)]
    pub fn info_positions(&self) -> &[usize] {
        &self.info_positions
    }
}

/// Prints the mask as a string of `1` (frozen) and `0` (information).
impl fmt::Display for FrozenMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &frozen in &self.frozen {
            f.write_str(if frozen { "1" } else { "0" })?;
        }
        Ok(())
    }
}

pub(crate) fn check_size(n: usize) -> Result<()> {
    if n.is_power_of_two() {
        Ok(())
    } else {
        Err(PolarError::InvalidSize { n })
    }
}
