//! Frame integrity checks.
//!
//! SC-Flip needs a way to tell a correct frame from a wrong one. The usual
//! choice is a CRC appended to the payload; tests use closures.

use crate::encoder::check_len;
use crate::{PolarError, Result};

/// Decides whether a candidate information frame is correct.
///
/// SC-Flip only ever calls `check` on the K decoded information bits of an
/// attempt. Any closure `Fn(&[u8]) -> bool` is a check, which is how tests
/// inject a genie that compares against the transmitted frame.
pub trait IntegrityCheck {
    fn check(&self, candidate: &[u8]) -> bool;
}

impl<F> IntegrityCheck for F
where
    F: Fn(&[u8]) -> bool,
{
    #[inline(always)]
    fn check(&self, candidate: &[u8]) -> bool {
        self(candidate)
    }
}

/// Named generator polynomials, top bit omitted.
const POLYNOMIALS: &[(&str, u32, usize)] = &[
    ("32-GZIP", 0x04C1_1DB7, 32),
    ("24-5GNR-A", 0x0086_4CFB, 24),
    ("24-5GNR-B", 0x0080_0063, 24),
    ("24-5GNR-C", 0x00B2_B117, 24),
    ("16-CCITT", 0x1021, 16),
    ("16-IBM", 0x8005, 16),
    ("11-5GNR", 0x0621, 11),
    ("8-DVB-S2", 0xD5, 8),
    ("6-5GNR", 0x21, 6),
    ("5-ITU", 0x15, 5),
    ("4-ITU", 0x3, 4),
    ("1-PAR", 0x1, 1),
];

/// Polynomial cyclic redundancy check over bit frames.
///
/// A frame of K bits is `[payload | crc]` where the last `size` bits hold the
/// remainder of the payload, register initialised to zero, bits processed
/// and emitted most significant first, no final XOR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc {
    /// Frame length including the CRC bits.
    k: usize,
    size: usize,
    poly: u32,
}

impl Crc {
    /// Builds a check from a polynomial description.
    ///
    /// `poly` is either one of the named polynomials (`"16-CCITT"`,
    /// `"24-5GNR-C"`, ...) or `"<size>-0x<hex>"` for an arbitrary generator.
    /// Names are matched case-insensitively.
    pub fn new(k: usize, poly: &str) -> Result<Self> {
        if let Some(&(_, value, size)) = POLYNOMIALS
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(poly))
        {
            return Self::with_polynomial(k, value, size);
        }

        let unknown = || PolarError::InvalidCrc(format!("unknown polynomial '{}'", poly));
        let (size, hex) = poly.split_once('-').ok_or_else(unknown)?;
        let size: usize = size.trim().parse().map_err(|_| unknown())?;
        let hex = hex
            .trim()
            .strip_prefix("0x")
            .or_else(|| hex.trim().strip_prefix("0X"))
            .ok_or_else(unknown)?;
        let value = u32::from_str_radix(hex, 16).map_err(|_| unknown())?;
        Self::with_polynomial(k, value, size)
    }

    /// Builds a check from an explicit generator (top bit omitted) and size.
    ///
    /// # Returns
    ///
    /// `InvalidCrc` when the size is outside `1..=32`, leaves no payload bit
    /// in a K-bit frame, or the generator does not fit in `size` bits.
    pub fn with_polynomial(k: usize, poly: u32, size: usize) -> Result<Self> {
        if size == 0 || size > 32 {
            return Err(PolarError::InvalidCrc(format!(
                "size {} is outside 1..=32",
                size
            )));
        }
        if size >= k {
            return Err(PolarError::InvalidCrc(format!(
                "a {}-bit CRC leaves no payload in a {}-bit frame",
                size, k
            )));
        }
        if u64::from(poly) >> size != 0 {
            return Err(PolarError::InvalidCrc(format!(
                "polynomial {:#x} does not fit in {} bits",
                poly, size
            )));
        }
        Ok(Self { k, size, poly })
    }

    /// Names of the built-in polynomials.
    pub fn names() -> impl Iterator<Item = &'static str> {
        POLYNOMIALS.iter().map(|&(name, _, _)| name)
    }

    /// Number of CRC bits.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn polynomial(&self) -> u32 {
        self.poly
    }

    /// Frame length K including the CRC.
    pub fn frame_len(&self) -> usize {
        self.k
    }

    /// Number of payload bits, K - size.
    pub fn payload_len(&self) -> usize {
        self.k - self.size
    }

    /// Remainder of `payload` as an integer.
    pub fn remainder(&self, payload: &[u8]) -> u32 {
        let top = 1u64 << (self.size - 1);
        let mask = (1u64 << self.size) - 1;
        let poly = u64::from(self.poly);
        let mut reg = 0u64;
        for &bit in payload {
            let feedback = ((reg & top) != 0) ^ (bit & 1 == 1);
            reg = (reg << 1) & mask;
            if feedback {
                reg ^= poly;
            }
        }
        reg as u32
    }

    /// Copies `payload` into `frame_out` and appends its CRC.
    pub fn attach(&self, payload: &[u8], frame_out: &mut [u8]) -> Result<()> {
        check_len(self.payload_len(), payload.len())?;
        check_len(self.k, frame_out.len())?;

        let (head, tail) = frame_out.split_at_mut(self.payload_len());
        head.copy_from_slice(payload);
        let rem = self.remainder(payload);
        for (i, out) in tail.iter_mut().enumerate() {
            *out = ((rem >> (self.size - 1 - i)) & 1) as u8;
        }
        Ok(())
    }
}

impl IntegrityCheck for Crc {
    /// Recomputes the CRC of the payload and compares it with the trailing
    /// bits. A frame of the wrong length never passes.
    fn check(&self, candidate: &[u8]) -> bool {
        if candidate.len() != self.k {
            return false;
        }
        let (payload, tail) = candidate.split_at(self.payload_len());
        let rem = self.remainder(payload);
        tail.iter()
            .enumerate()
            .all(|(i, &bit)| u32::from(bit) == (rem >> (self.size - 1 - i)) & 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_bits(text: &str) -> Vec<u8> {
        text.bytes()
            .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1))
            .collect()
    }

    #[test]
    fn ccitt_matches_the_xmodem_check_value() {
        let payload = ascii_bits("123456789");
        let crc = Crc::new(payload.len() + 16, "16-CCITT").unwrap();
        assert_eq!(crc.remainder(&payload), 0x31C3);
    }

    #[test]
    fn dvb_s2_matches_its_check_value() {
        let payload = ascii_bits("123456789");
        let crc = Crc::new(payload.len() + 8, "8-dvb-s2").unwrap();
        assert_eq!(crc.remainder(&payload), 0xBC);
    }

    #[test]
    fn attached_frames_pass_and_corrupted_frames_fail() {
        let crc = Crc::new(32, "8-DVB-S2").unwrap();
        let payload: Vec<u8> = (0..24).map(|i| ((i * 7) % 3 == 0) as u8).collect();
        let mut frame = vec![0u8; 32];
        crc.attach(&payload, &mut frame).unwrap();
        assert_eq!(&frame[..24], payload.as_slice());
        assert!(crc.check(&frame));

        for i in 0..frame.len() {
            frame[i] ^= 1;
            assert!(!crc.check(&frame), "error at bit {} went undetected", i);
            frame[i] ^= 1;
        }
        assert!(!crc.check(&frame[..31]));
    }

    #[test]
    fn hex_polynomials_are_accepted() {
        let named = Crc::new(64, "16-CCITT").unwrap();
        let hex = Crc::new(64, "16-0x1021").unwrap();
        assert_eq!(named, hex);
        assert_eq!(hex.payload_len(), 48);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(matches!(Crc::new(16, "WHATEVER"), Err(PolarError::InvalidCrc(_))));
        assert!(matches!(Crc::new(16, "16-CCITT"), Err(PolarError::InvalidCrc(_))));
        assert!(matches!(
            Crc::with_polynomial(64, 0x1FF, 8),
            Err(PolarError::InvalidCrc(_))
        ));
        assert!(matches!(
            Crc::with_polynomial(64, 0x1, 0),
            Err(PolarError::InvalidCrc(_))
        ));
        assert!(Crc::names().any(|name| name == "32-GZIP"));
    }

    #[test]
    fn closures_are_checks() {
        let expected = [1u8, 0, 1];
        let genie = |candidate: &[u8]| candidate == expected;
        assert!(genie.check(&[1, 0, 1]));
        assert!(!genie.check(&[1, 1, 1]));
    }
}
