//! End-to-end scenarios for SC and SC-Flip decoding.

use polar_core::{
    Construction, Crc, DecodeOutcome, FrameStatus, FrozenMask, IntegrityCheck, MinSum,
    PolarError, ScDecoder, ScFlipDecoder, build_frozen_mask, decode, encode,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

const INFO: [u8; 4] = [1, 0, 1, 1];

fn reference_mask() -> FrozenMask {
    FrozenMask::from_bits(vec![true, true, false, true, false, false, true, false]).unwrap()
}

fn bpsk(codeword: &[u8], amplitude: f32) -> Vec<f32> {
    codeword
        .iter()
        .map(|&b| if b == 1 { -amplitude } else { amplitude })
        .collect()
}

#[test]
fn reference_frame_encodes_and_decodes() {
    let mask = reference_mask();
    let codeword = encode(&INFO, &mask).unwrap();
    assert_eq!(codeword, vec![1, 0, 0, 1, 0, 0, 1, 1]);

    let (info, ok) = decode::<Crc>(&bpsk(&codeword, 10.0), &mask, 4, None).unwrap();
    assert_eq!(info, INFO.to_vec());
    assert!(ok);
}

#[test]
fn single_corrupted_bit_needs_one_flip() {
    let mask = reference_mask();
    let codeword = encode(&INFO, &mask).unwrap();
    let genie = |candidate: &[u8]| candidate == INFO;

    for corrupted in 0..codeword.len() {
        let mut llr = bpsk(&codeword, 10.0);
        llr[corrupted] = -llr[corrupted];

        let plain = ScDecoder::<MinSum>::new(&mask).decode(&llr).unwrap();
        assert_ne!(plain, INFO.to_vec(), "corrupted bit {}", corrupted);

        let (info, ok) = decode(&llr, &mask, 0, Some(genie)).unwrap();
        assert!(!ok);
        assert_eq!(info, plain);

        let (info, ok) = decode(&llr, &mask, 1, Some(genie)).unwrap();
        assert!(ok, "corrupted bit {}", corrupted);
        assert_eq!(info, INFO.to_vec());
    }
}

#[test]
fn clean_crc_frame_passes_on_the_first_attempt() {
    let n = 64;
    let k = 40;
    let mask = build_frozen_mask(n, k, &Construction::ReliabilityTable).unwrap();
    let crc = Crc::new(k, "8-DVB-S2").unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let payload: Vec<u8> = (0..crc.payload_len()).map(|_| rng.gen_range(0..2u8)).collect();
    let mut frame = vec![0u8; k];
    crc.attach(&payload, &mut frame).unwrap();

    let codeword = encode(&frame, &mask).unwrap();
    let llr = bpsk(&codeword, 4.0);
    let mut decoder = ScFlipDecoder::<_, MinSum>::new(&mask, Some(crc), 8);
    let (info, outcome) = decoder.decode(&llr).unwrap();
    assert_eq!(info, frame);
    assert_eq!(
        outcome,
        DecodeOutcome {
            attempts: 1,
            status: FrameStatus::Passed,
            flipped: None,
        }
    );
}

/// Outcome of every frame of a seeded AWGN run, true when the integrity
/// check accepted the frame.
fn noisy_run(n_flips: usize, frames: usize) -> Vec<bool> {
    let n = 128;
    let k = 72;
    let ebn0_db = 2.0f64;
    let crc = Crc::new(k, "8-DVB-S2").unwrap();
    let rate = crc.payload_len() as f64 / n as f64;
    let sigma = (1.0 / (2.0 * rate * 10f64.powf(ebn0_db / 10.0))).sqrt();

    let mask = build_frozen_mask(n, k, &Construction::GaussianApproximation { sigma }).unwrap();
    let mut decoder = ScFlipDecoder::<_, MinSum>::new(&mask, Some(crc), n_flips);
    let noise = Normal::new(0.0, sigma).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let mut payload = vec![0u8; crc.payload_len()];
    let mut frame = vec![0u8; k];
    let mut info = vec![0u8; k];
    let mut results = Vec::with_capacity(frames);
    for _ in 0..frames {
        payload.iter_mut().for_each(|b| *b = rng.gen_range(0..2u8));
        crc.attach(&payload, &mut frame).unwrap();
        let codeword = encode(&frame, &mask).unwrap();
        let llr: Vec<f32> = codeword
            .iter()
            .map(|&b| {
                let x = if b == 1 { -1.0 } else { 1.0 };
                let y = x + noise.sample(&mut rng);
                (2.0 * y / (sigma * sigma)) as f32
            })
            .collect();
        let outcome = decoder.decode_into(&llr, &mut info).unwrap();
        assert_eq!(outcome.status == FrameStatus::Passed, crc.check(&info));
        results.push(outcome.is_success());
    }
    results
}

#[test]
fn larger_flip_budget_never_loses_a_frame() {
    let frames = 300;
    let none = noisy_run(0, frames);
    let few = noisy_run(2, frames);
    let many = noisy_run(8, frames);

    for i in 0..frames {
        assert!(!none[i] || few[i], "frame {} lost with 2 flips", i);
        assert!(!few[i] || many[i], "frame {} lost with 8 flips", i);
    }
    let count = |r: &[bool]| r.iter().filter(|&&ok| ok).count();
    assert!(count(&many) >= count(&few));
    assert!(count(&few) >= count(&none));
}

#[test]
fn configuration_errors_surface_before_decoding() {
    assert_eq!(
        build_frozen_mask(12, 4, &Construction::ReliabilityTable),
        Err(PolarError::InvalidSize { n: 12 })
    );
    assert_eq!(
        build_frozen_mask(2048, 4, &Construction::ReliabilityTable),
        Err(PolarError::TableTooShort { n: 2048, max: 1024 })
    );
    assert!(matches!(
        build_frozen_mask(8, 4, &Construction::GaussianApproximation { sigma: 0.0 }),
        Err(PolarError::InvalidNoise { .. })
    ));
    let err = build_frozen_mask(4, 2, &Construction::ChannelOrder(vec![0, 1, 1, 3])).unwrap_err();
    assert!(err.is_resource());

    let mask = reference_mask();
    assert_eq!(
        decode::<Crc>(&[1.0; 7], &mask, 0, None),
        Err(PolarError::LengthMismatch {
            expected: 8,
            actual: 7
        })
    );
}
