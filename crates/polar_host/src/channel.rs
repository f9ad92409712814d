//! BPSK modulation over an AWGN channel.
//!
//! Bit 0 maps to +1 and bit 1 to -1, so a positive LLR favours 0 as the
//! decoders expect. The channel outputs LLRs `2y / sigma^2` directly.

use anyhow::{Result, ensure};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Noise standard deviation for a given Eb/N0 and code rate.
///
/// `sigma^2 = 1 / (2 R 10^(EbN0 / 10))`, with R counting only the payload
/// bits (K minus the CRC size) per channel use.
pub fn sigma_from_ebn0(ebn0_db: f64, rate: f64) -> f64 {
    (1.0 / (2.0 * rate * 10f64.powf(ebn0_db / 10.0))).sqrt()
}

/// Erasure probability of the BEC matched to an AWGN channel, taken as the
/// Bhattacharyya parameter `exp(-1 / (2 sigma^2))` of BPSK.
pub fn matched_erasure_probability(sigma: f64) -> f64 {
    (-1.0 / (2.0 * sigma * sigma)).exp()
}

/// BPSK modulator and AWGN channel producing LLRs.
#[derive(Debug, Clone, Copy)]
pub struct AwgnChannel {
    sigma: f64,
    noise: Normal<f64>,
}

impl AwgnChannel {
    pub fn new(sigma: f64) -> Result<Self> {
        ensure!(
            sigma.is_finite() && sigma > 0.0,
            "noise standard deviation must be positive, got {}",
            sigma
        );
        let noise = Normal::new(0.0, sigma)?;
        Ok(Self { sigma, noise })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Modulates `codeword`, adds noise and writes the channel LLRs.
    pub fn transmit<R: Rng + ?Sized>(&self, codeword: &[u8], llr_out: &mut [f32], rng: &mut R) {
        let scale = 2.0 / (self.sigma * self.sigma);
        for (llr, &bit) in llr_out.iter_mut().zip(codeword) {
            let x = if bit == 0 { 1.0 } else { -1.0 };
            let y = x + self.noise.sample(rng);
            *llr = (scale * y) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sigma_matches_rate_half_reference() {
        // R = 1/2 at 0 dB gives unit noise variance
        assert!((sigma_from_ebn0(0.0, 0.5) - 1.0).abs() < 1e-12);
        assert!(sigma_from_ebn0(3.0, 0.5) < sigma_from_ebn0(1.0, 0.5));
    }

    #[test]
    fn high_snr_llrs_follow_bpsk_signs() {
        let channel = AwgnChannel::new(0.05).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let codeword = [0u8, 1, 1, 0, 1];
        let mut llr = [0f32; 5];
        channel.transmit(&codeword, &mut llr, &mut rng);
        for (&bit, &l) in codeword.iter().zip(&llr) {
            assert_eq!(bit == 1, l < 0.0);
        }
    }

    #[test]
    fn invalid_sigma_is_rejected() {
        assert!(AwgnChannel::new(0.0).is_err());
        assert!(AwgnChannel::new(f64::NAN).is_err());
    }

    #[test]
    fn erasure_probability_grows_with_noise() {
        assert!(matched_erasure_probability(0.5) < matched_erasure_probability(1.0));
        assert!(matched_erasure_probability(1.0) < 1.0);
    }
}
