//! Test data generator for polar-code benchmarks.
//!
//! Writes random information frames to a .b8 file, optionally protected by
//! a CRC, for later use by the `run` command.

use anyhow::{Context, Result};
use polar_core::Crc;
use polar_io::loader;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

/// Generates random K-bit information frames.
///
/// With a CRC, the first `K - size` bits of every frame are random and the
/// rest hold their CRC. The generator is seeded, so the same arguments always
/// produce the same file.
///
/// # Arguments
///
/// * `out` - Output path for the frame data (.b8 file)
/// * `k` - Bits per frame, CRC included
/// * `num_frames` - Number of frames to generate
/// * `crc` - Optional CRC polynomial name
/// * `seed` - Seed of the bit generator
pub fn generate_frames(
    out: &Path,
    k: usize,
    num_frames: usize,
    crc: Option<&str>,
    seed: u64,
) -> Result<Vec<Vec<u8>>> {
    let crc = crc
        .map(|poly| Crc::new(k, poly))
        .transpose()
        .context("Failed to build the CRC")?;
    println!("Generating {} frames of {} bits...", num_frames, k);

    let mut rng = StdRng::seed_from_u64(seed);
    let payload_len = crc.map_or(k, |c| c.payload_len());
    let mut payload = vec![0u8; payload_len];
    let mut frames = Vec::with_capacity(num_frames);

    for _ in 0..num_frames {
        payload.iter_mut().for_each(|b| *b = rng.gen_range(0..2u8));
        let frame = match crc {
            Some(crc) => {
                let mut frame = vec![0u8; k];
                crc.attach(&payload, &mut frame)?;
                frame
            }
            None => payload.clone(),
        };
        frames.push(frame);
    }

    loader::write_b8_file(out, &frames, k)?;
    info!(path = %out.display(), frames = num_frames, k, "frames written");
    println!("Done.");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polar_core::IntegrityCheck;

    #[test]
    fn generated_frames_round_trip_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.b8");
        let frames = generate_frames(&path, 20, 5, Some("8-DVB-S2"), 1).unwrap();

        let crc = Crc::new(20, "8-DVB-S2").unwrap();
        assert!(frames.iter().all(|f| crc.check(f)));

        let bits = loader::load_b8_file(&path).unwrap();
        assert_eq!(loader::slice_frames(&bits, 20), frames);
    }

    #[test]
    fn generation_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let a = generate_frames(&dir.path().join("a.b8"), 12, 4, None, 42).unwrap();
        let b = generate_frames(&dir.path().join("b.b8"), 12, 4, None, 42).unwrap();
        assert_eq!(a, b);
    }
}
