//! SC-Flip decoding.
//!
//! Wraps an [`ScDecoder`] and reruns it with one information decision
//! inverted at a time until an [`IntegrityCheck`] accepts the frame.

use crate::decoder::{DecodeOutcome, FrameDecoder, FrameStatus, ScDecoder};
use crate::encoder::check_len;
use crate::frozen::FrozenMask;
use crate::integrity::IntegrityCheck;
use crate::kernel::{Kernel, MinSum};
use crate::Result;
use tracing::trace;

/// Information position with the confidence of its first-pass decision.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FlipCandidate {
    position: usize,
    confidence: f32,
}

/// SC decoder with bounded bit flipping.
///
/// Runs plain SC first. If the integrity check rejects the result, the
/// information leaves are ranked by ascending `|LLR|` of their first-pass
/// decision and SC is rerun up to `n_flips` times, each rerun forcing the
/// next candidate to its opposite value. The first attempt that passes the
/// check is returned.
///
/// When every attempt fails, the information bits of the first attempt are
/// returned with [`FrameStatus::Failed`]. Without a check there is nothing to
/// reject a frame, so the flip budget is ignored and every frame is reported
/// as [`FrameStatus::Unchecked`].
pub struct ScFlipDecoder<'a, C: IntegrityCheck, K: Kernel = MinSum> {
    sc: ScDecoder<'a, K>,
    check: Option<C>,
    n_flips: usize,

    /// Flip candidates of the current frame, reused across frames.
    candidates: Vec<FlipCandidate>,

    /// Information bits of the first attempt.
    first_pass: Vec<u8>,
}

impl<'a, C: IntegrityCheck, K: Kernel> ScFlipDecoder<'a, C, K> {
    /// Creates a decoder for the code described by `mask`.
    ///
    /// # Arguments
    ///
    /// * `mask` - Frozen mask shared with the encoder
    /// * `check` - Integrity check run on each attempt's K information bits
    /// * `n_flips` - Maximum number of reruns after the first attempt. Values
    ///   above K are capped at K, since there are only K candidates.
    pub fn new(mask: &'a FrozenMask, check: Option<C>, n_flips: usize) -> Self {
        let k = mask.k();
        let n_flips = if check.is_some() { n_flips.min(k) } else { 0 };
        Self {
            sc: ScDecoder::new(mask),
            check,
            n_flips,
            candidates: Vec::with_capacity(k),
            first_pass: vec![0; k],
        }
    }

    pub fn mask(&self) -> &'a FrozenMask {
        self.sc.mask()
    }

    /// Effective flip budget.
    pub fn n_flips(&self) -> usize {
        self.n_flips
    }

    pub fn has_check(&self) -> bool {
        self.check.is_some()
    }

    /// Decodes N soft values into K information bits.
    ///
    /// # Returns
    ///
    /// The number of attempts, the final status and the flipped position of
    /// the accepted attempt. Only buffer size errors are returned as `Err`.
    pub fn decode_into(&mut self, soft: &[f32], info_out: &mut [u8]) -> Result<DecodeOutcome> {
        check_len(self.sc.mask().k(), info_out.len())?;
        self.sc.run(soft)?;
        self.sc.extract_info(info_out)?;

        let check = match &self.check {
            Some(check) => check,
            None => return Ok(DecodeOutcome::first_pass(FrameStatus::Unchecked)),
        };
        if check.check(info_out) {
            return Ok(DecodeOutcome::first_pass(FrameStatus::Passed));
        }
        if self.n_flips == 0 {
            return Ok(DecodeOutcome::first_pass(FrameStatus::Failed));
        }

        self.first_pass.copy_from_slice(info_out);
        rank_candidates(
            self.sc.mask().info_positions(),
            self.sc.leaf_soft(),
            &mut self.candidates,
        );

        for (attempt, candidate) in self.candidates.iter().take(self.n_flips).enumerate() {
            self.sc.run_with_flip(soft, Some(candidate.position))?;
            self.sc.extract_info(info_out)?;
            if check.check(info_out) {
                trace!(
                    position = candidate.position,
                    attempts = attempt + 2,
                    "flip accepted"
                );
                return Ok(DecodeOutcome {
                    attempts: attempt + 2,
                    status: FrameStatus::Passed,
                    flipped: Some(candidate.position),
                });
            }
        }

        info_out.copy_from_slice(&self.first_pass);
        Ok(DecodeOutcome {
            attempts: self.n_flips + 1,
            status: FrameStatus::Failed,
            flipped: None,
        })
    }

    /// Decodes into a freshly allocated information vector.
    pub fn decode(&mut self, soft: &[f32]) -> Result<(Vec<u8>, DecodeOutcome)> {
        let mut info = vec![0u8; self.sc.mask().k()];
        let outcome = self.decode_into(soft, &mut info)?;
        Ok((info, outcome))
    }
}

impl<C: IntegrityCheck, K: Kernel> FrameDecoder for ScFlipDecoder<'_, C, K> {
    fn decode_frame(&mut self, soft: &[f32], info_out: &mut [u8]) -> Result<DecodeOutcome> {
        self.decode_into(soft, info_out)
    }

    fn mask(&self) -> &FrozenMask {
        self.sc.mask()
    }
}

/// Orders the information positions by ascending `|leaf soft|`, ties broken
/// by ascending position.
fn rank_candidates(positions: &[usize], leaf_soft: &[f32], out: &mut Vec<FlipCandidate>) {
    out.clear();
    out.extend(positions.iter().map(|&position| FlipCandidate {
        position,
        confidence: leaf_soft[position].abs(),
    }));
    out.sort_by(|a, b| {
        a.confidence
            .total_cmp(&b.confidence)
            .then(a.position.cmp(&b.position))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::PolarEncoder;
    use crate::integrity::Crc;

    fn reference_mask() -> FrozenMask {
        FrozenMask::from_bits(vec![true, true, false, true, false, false, true, false]).unwrap()
    }

    fn to_llr(codeword: &[u8]) -> Vec<f32> {
        codeword
            .iter()
            .map(|&b| if b == 1 { -10.0 } else { 10.0 })
            .collect()
    }

    const INFO: [u8; 4] = [1, 0, 1, 1];

    fn genie(candidate: &[u8]) -> bool {
        candidate == INFO
    }

    #[test]
    fn ranking_uses_magnitude_then_position() {
        let mut out = Vec::new();
        rank_candidates(&[0, 1, 2, 3], &[-3.0, 1.0, -1.0, 0.5], &mut out);
        let order: Vec<usize> = out.iter().map(|c| c.position).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);

        // signed zeros have the same magnitude
        rank_candidates(&[4, 6], &[0.0, 0.0, 0.0, 0.0, -0.0, 0.0, 0.0], &mut out);
        assert_eq!(out[0].position, 4);
    }

    #[test]
    fn clean_frame_passes_on_the_first_attempt() {
        let mask = reference_mask();
        let codeword = PolarEncoder::new(&mask).encode_to_vec(&INFO).unwrap();
        let mut decoder = ScFlipDecoder::<_, MinSum>::new(&mask, Some(genie), 3);
        let (info, outcome) = decoder.decode(&to_llr(&codeword)).unwrap();
        assert_eq!(info, INFO);
        assert_eq!(outcome, DecodeOutcome::first_pass(FrameStatus::Passed));
    }

    #[test]
    fn single_flip_recovers_a_corrupted_frame() {
        let mask = reference_mask();
        let codeword = PolarEncoder::new(&mask).encode_to_vec(&INFO).unwrap();
        for corrupted in 0..8 {
            let mut llr = to_llr(&codeword);
            llr[corrupted] = -llr[corrupted];

            let mut sc = ScDecoder::<MinSum>::new(&mask);
            assert_ne!(sc.decode(&llr).unwrap(), INFO.to_vec());

            let mut plain = ScFlipDecoder::<_, MinSum>::new(&mask, Some(genie), 0);
            let (info, outcome) = plain.decode(&llr).unwrap();
            assert_eq!(outcome.status, FrameStatus::Failed);
            assert_eq!(outcome.attempts, 1);
            assert_ne!(info, INFO.to_vec());

            let mut decoder = ScFlipDecoder::<_, MinSum>::new(&mask, Some(genie), 1);
            let (info, outcome) = decoder.decode(&llr).unwrap();
            assert_eq!(info, INFO.to_vec(), "corrupted bit {}", corrupted);
            assert_eq!(outcome.status, FrameStatus::Passed);
            assert_eq!(outcome.attempts, 2);
            assert_eq!(outcome.flipped, Some(2));
        }
    }

    #[test]
    fn exhausted_budget_returns_the_first_attempt() {
        let mask = reference_mask();
        let codeword = PolarEncoder::new(&mask).encode_to_vec(&INFO).unwrap();
        let llr = to_llr(&codeword);
        let reject_all = |_: &[u8]| false;
        let mut decoder = ScFlipDecoder::<_, MinSum>::new(&mask, Some(reject_all), 10);
        assert_eq!(decoder.n_flips(), 4);

        let (info, outcome) = decoder.decode(&llr).unwrap();
        assert_eq!(info, INFO.to_vec());
        assert_eq!(outcome.status, FrameStatus::Failed);
        assert_eq!(outcome.attempts, 5);
        assert!(!outcome.is_success());
    }

    #[test]
    fn missing_check_disables_flipping() {
        let mask = reference_mask();
        let decoder = ScFlipDecoder::<Crc, MinSum>::new(&mask, None, 8);
        assert_eq!(decoder.n_flips(), 0);
        assert!(!decoder.has_check());

        let mut decoder = decoder;
        let (info, outcome) = decoder.decode(&[-1.0; 8]).unwrap();
        assert_eq!(outcome.status, FrameStatus::Unchecked);
        assert!(outcome.is_success());
        assert_eq!(info.len(), 4);
    }
}
