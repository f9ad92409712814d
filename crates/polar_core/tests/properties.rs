//! Property-based tests for construction, encoding and decoding.
//!
//! Codes and frames are drawn from a seeded generator inside each case so
//! that one proptest input (a length exponent and a seed) describes a whole
//! (mask, frame, noise) triple.

use polar_core::{
    BoxPlus, Construction, Crc, FrameStatus, FrozenMask, MinSum, PolarEncoder, ScDecoder,
    ScFlipDecoder, encode,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn random_mask(rng: &mut StdRng, n: usize) -> FrozenMask {
    let mut frozen: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();
    let keep = rng.gen_range(0..n);
    frozen[keep] = false;
    FrozenMask::from_bits(frozen).unwrap()
}

fn random_bits(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen_range(0..2u8)).collect()
}

fn noiseless_llr(codeword: &[u8]) -> Vec<f32> {
    codeword
        .iter()
        .map(|&b| if b == 1 { -10.0 } else { 10.0 })
        .collect()
}

fn constructions(rng: &mut StdRng, n: usize) -> Vec<Construction> {
    let mut best_first: Vec<usize> = (0..n).collect();
    best_first.shuffle(rng);
    let bounds: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..0.5)).collect();
    vec![
        Construction::GaussianApproximation {
            sigma: rng.gen_range(0.3..2.0),
        },
        Construction::ReliabilityTable,
        Construction::ErrorBounds(bounds),
        Construction::ErasureChannel {
            erasure_probability: rng.gen_range(0.05..0.95),
        },
        Construction::ChannelOrder(best_first),
    ]
}

proptest! {
    /// Decoding the noiseless image of an encoded frame returns the frame,
    /// for any mask and either kernel.
    #[test]
    fn prop_noiseless_round_trip(m in 0u32..9, seed in any::<u64>()) {
        let n = 1usize << m;
        let mut rng = StdRng::seed_from_u64(seed);
        let mask = random_mask(&mut rng, n);
        let info = random_bits(&mut rng, mask.k());

        let codeword = encode(&info, &mask).unwrap();
        let llr = noiseless_llr(&codeword);

        let mut min_sum = ScDecoder::<MinSum>::new(&mask);
        prop_assert_eq!(min_sum.decode(&llr).unwrap(), info.clone());
        let mut box_plus = ScDecoder::<BoxPlus>::new(&mask);
        prop_assert_eq!(box_plus.decode(&llr).unwrap(), info);
    }

    /// Every construction method freezes exactly N - K channels.
    #[test]
    fn prop_mask_counts(m in 1u32..10, seed in any::<u64>()) {
        let n = 1usize << m;
        let mut rng = StdRng::seed_from_u64(seed);
        let k = rng.gen_range(1..=n);
        for construction in constructions(&mut rng, n) {
            let mask = FrozenMask::build(n, k, &construction).unwrap();
            prop_assert_eq!(mask.k(), k, "{:?}", construction.method());
            prop_assert_eq!(mask.frozen_count(), n - k);
            prop_assert_eq!(mask.as_slice().iter().filter(|&&f| f).count(), n - k);
            prop_assert!(mask.info_positions().windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// Frozen leaves decide 0 and the re-encoded decisions form a codeword,
    /// whatever the channel values.
    #[test]
    fn prop_decisions_respect_the_mask(m in 1u32..8, seed in any::<u64>()) {
        let n = 1usize << m;
        let mut rng = StdRng::seed_from_u64(seed);
        let mask = random_mask(&mut rng, n);
        let llr: Vec<f32> = (0..n).map(|_| rng.gen_range(-4.0f32..4.0)).collect();

        let mut decoder = ScDecoder::<MinSum>::new(&mask);
        decoder.run(&llr).unwrap();
        for (pos, &bit) in decoder.decisions().iter().enumerate() {
            prop_assert!(!mask.is_frozen(pos) || bit == 0, "frozen leaf {} decided 1", pos);
        }
        prop_assert!(PolarEncoder::new(&mask).is_codeword(decoder.codeword()));
    }

    /// Encoder outputs are always codewords.
    #[test]
    fn prop_encodes_are_codewords(m in 0u32..10, seed in any::<u64>()) {
        let n = 1usize << m;
        let mut rng = StdRng::seed_from_u64(seed);
        let mask = random_mask(&mut rng, n);
        let info = random_bits(&mut rng, mask.k());
        let encoder = PolarEncoder::new(&mask);
        prop_assert!(encoder.is_codeword(&encoder.encode_to_vec(&info).unwrap()));
    }

    /// SC-Flip with a zero budget behaves exactly like plain SC.
    #[test]
    fn prop_zero_flips_is_plain_sc(m in 4u32..8, seed in any::<u64>()) {
        let n = 1usize << m;
        let mut rng = StdRng::seed_from_u64(seed);
        let k = rng.gen_range(9..=n);
        let mask = FrozenMask::build(n, k, &Construction::ReliabilityTable).unwrap();
        let crc = Crc::new(k, "8-DVB-S2").unwrap();
        let llr: Vec<f32> = (0..n).map(|_| rng.gen_range(-3.0f32..3.0)).collect();

        let mut sc = ScDecoder::<MinSum>::new(&mask);
        let expected = sc.decode(&llr).unwrap();

        let mut flip = ScFlipDecoder::<_, MinSum>::new(&mask, Some(crc), 0);
        let (info, outcome) = flip.decode(&llr).unwrap();
        prop_assert_eq!(&info, &expected);
        prop_assert_eq!(outcome.attempts, 1);
        prop_assert_eq!(outcome.flipped, None);
        let status = if polar_core::IntegrityCheck::check(&crc, &expected) {
            FrameStatus::Passed
        } else {
            FrameStatus::Failed
        };
        prop_assert_eq!(outcome.status, status);
    }
}
