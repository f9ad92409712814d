//! Polar encoder.
//!
//! Encoding is a scatter followed by the recursive XOR transform. The
//! transform is its own inverse over GF(2), which is what makes the
//! codeword check cheap: transforming a codeword recovers the scattered
//! vector, whose frozen positions must all be zero.

use crate::frozen::FrozenMask;
use crate::{PolarError, Result};

/// Applies the polar butterfly transform in place.
///
/// For `k = N/2, N/4, ..., 1` and for every block of `2k` bits, the first
/// half of the block is XORed with the second half. O(N log N) XORs, no
/// allocation. The slice length must be a power of two.
pub fn polar_transform(bits: &mut [u8]) {
    let mut k = bits.len() >> 1;
    while k > 0 {
        for block in bits.chunks_exact_mut(2 * k) {
            let (left, right) = block.split_at_mut(k);
            for (l, r) in left.iter_mut().zip(right.iter()) {
                *l ^= *r;
            }
        }
        k >>= 1;
    }
}

/// Non-systematic polar encoder bound to one frozen mask.
///
/// Borrows the mask rather than copying it so the encoder and the decoders
/// of a link provably share one instance. Bits are `u8` values 0 or 1.
#[derive(Debug, Clone, Copy)]
pub struct PolarEncoder<'a> {
    mask: &'a FrozenMask,
}

impl<'a> PolarEncoder<'a> {
    pub fn new(mask: &'a FrozenMask) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> &'a FrozenMask {
        self.mask
    }

    /// Places `info[j]` at the j-th information position and 0 at every
    /// frozen position.
    pub fn scatter(&self, info: &[u8], u: &mut [u8]) -> Result<()> {
        check_len(self.mask.k(), info.len())?;
        check_len(self.mask.n(), u.len())?;

        u.fill(0);
        for (&pos, &bit) in self.mask.info_positions().iter().zip(info.iter()) {
            u[pos] = bit;
        }
        Ok(())
    }

    /// Encodes K information bits into `codeword` (length N).
    ///
    /// # Arguments
    ///
    /// * `info` - K information bits
    /// * `codeword` - Output buffer of N bits
    ///
    /// # Returns
    ///
    /// `LengthMismatch` if either buffer has the wrong size.
    pub fn encode(&self, info: &[u8], codeword: &mut [u8]) -> Result<()> {
        self.scatter(info, codeword)?;
        polar_transform(codeword);
        Ok(())
    }

    /// Encodes into a freshly allocated codeword.
    pub fn encode_to_vec(&self, info: &[u8]) -> Result<Vec<u8>> {
        let mut codeword = vec![0u8; self.mask.n()];
        self.encode(info, &mut codeword)?;
        Ok(codeword)
    }

    /// Reads the information positions of an untransformed vector.
    ///
    /// Only meaningful on the scattered vector (before the transform) or on
    /// the leaf decisions of a decoder.
    pub fn extract(&self, u: &[u8], info: &mut [u8]) -> Result<()> {
        check_len(self.mask.n(), u.len())?;
        check_len(self.mask.k(), info.len())?;
        gather(self.mask.info_positions(), u, info);
        Ok(())
    }

    /// Whether `candidate` is a codeword of this code.
    ///
    /// Transforms a copy and checks that every frozen position comes back
    /// as zero. Allocates; meant for tests and sanity checks, not for the
    /// decode loop. A candidate of the wrong length is never a codeword.
    pub fn is_codeword(&self, candidate: &[u8]) -> bool {
        if candidate.len() != self.mask.n() {
            return false;
        }
        let mut u = candidate.to_vec();
        polar_transform(&mut u);
        u.iter()
            .zip(self.mask.as_slice())
            .all(|(&bit, &frozen)| !frozen || bit == 0)
    }
}

#[inline(always)]
pub(crate) fn gather(positions: &[usize], u: &[u8], info: &mut [u8]) {
    for (out, &pos) in info.iter_mut().zip(positions.iter()) {
        *out = u[pos];
    }
}

pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PolarError::LengthMismatch { expected, actual })
    }
}
