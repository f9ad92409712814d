use anyhow::{Context, Result, ensure};
use bitvec::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Loads a .b8 file (packed frame data).
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open .b8 file {}", path.display()))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    debug!(path = %path.display(), bytes = buffer.len(), "loaded frame file");

    // Bytes are little endian at the bit level: bit 0 of a frame is the LSB
    Ok(BitVec::<u8, Lsb0>::from_vec(buffer))
}

/// Writes packed frames to a .b8 file.
pub fn write_b8_file<P: AsRef<Path>>(path: P, frames: &[Vec<u8>], bits_per_frame: usize) -> Result<()> {
    let path = path.as_ref();
    let bytes = pack_frames(frames, bits_per_frame)?;
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create .b8 file {}", path.display()))?;
    file.write_all(&bytes)?;
    debug!(path = %path.display(), frames = frames.len(), "wrote frame file");
    Ok(())
}

/// Splits packed data into frames of `bits_per_frame` bits.
///
/// A trailing partial frame is ignored.
pub fn slice_frames(raw_bits: &BitSlice<u8, Lsb0>, bits_per_frame: usize) -> Vec<Vec<u8>> {
    if bits_per_frame == 0 {
        return Vec::new();
    }
    let stride_bits = bits_per_frame.div_ceil(8) * 8;

    let num_frames = raw_bits.len() / stride_bits;
    let mut frames = Vec::with_capacity(num_frames);

    for i in 0..num_frames {
        let start = i * stride_bits;
        let slice = &raw_bits[start..start + bits_per_frame];
        frames.push(slice.iter().map(|b| *b as u8).collect());
    }

    frames
}

/// Packs frames of `bits_per_frame` bits, each padded to a byte boundary.
pub fn pack_frames(frames: &[Vec<u8>], bits_per_frame: usize) -> Result<Vec<u8>> {
    let stride_bits = bits_per_frame.div_ceil(8) * 8;
    let mut bits = BitVec::<u8, Lsb0>::with_capacity(frames.len() * stride_bits);

    for (i, frame) in frames.iter().enumerate() {
        ensure!(
            frame.len() == bits_per_frame,
            "frame {} has {} bits, expected {}",
            i,
            frame.len(),
            bits_per_frame
        );
        bits.extend(frame.iter().map(|&b| b != 0));
        bits.resize((i + 1) * stride_bits, false);
    }

    Ok(bits.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_lsb_first_and_byte_aligned() {
        let frames = vec![vec![1, 0, 0, 0, 0, 0, 0, 0, 1, 1], vec![0, 1, 0, 0, 0, 0, 0, 0, 0, 1]];
        let bytes = pack_frames(&frames, 10).unwrap();
        assert_eq!(bytes, vec![0x01, 0x03, 0x02, 0x02]);

        let bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        assert_eq!(slice_frames(&bits, 10), frames);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let bits = BitVec::<u8, Lsb0>::from_vec(vec![0xFF, 0x0F, 0x01]);
        let frames = slice_frames(&bits, 12);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn wrong_frame_length_is_rejected() {
        assert!(pack_frames(&[vec![1, 0, 1]], 4).is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.b8");
        let frames = vec![vec![1, 1, 0], vec![0, 0, 1], vec![1, 0, 1]];
        write_b8_file(&path, &frames, 3).unwrap();

        let bits = load_b8_file(&path).unwrap();
        assert_eq!(bits.len(), 24);
        assert_eq!(slice_frames(&bits, 3), frames);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_b8_file("/nonexistent/frames.b8").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/frames.b8"));
    }
}
