//! A configured polar link: frozen mask, optional CRC and decoder settings.
//!
//! The link owns the mask; every worker thread borrows it and builds its own
//! decoder through [`Link::decoder`].

use crate::KernelKind;
use crate::channel::AwgnChannel;
use crate::stats::{FrameReport, count_bit_errors};
use anyhow::{Context, Result};
use polar_core::{
    BoxPlus, Construction, Crc, FrameDecoder, FrozenMask, MinSum, PolarEncoder, ScFlipDecoder,
};
use rand::Rng;
use std::time::Instant;
use tracing::{debug, warn};

pub struct Link {
    pub mask: FrozenMask,
    pub crc: Option<Crc>,
    pub n_flips: usize,
    pub kernel: KernelKind,
}

impl Link {
    /// Builds the mask and the CRC of an (N, K) link.
    ///
    /// # Arguments
    ///
    /// * `crc` - Polynomial name or `<size>-0x<hex>`, see [`Crc::new`]
    pub fn new(
        n: usize,
        k: usize,
        construction: &Construction,
        crc: Option<&str>,
        n_flips: usize,
        kernel: KernelKind,
    ) -> Result<Self> {
        let mask = FrozenMask::build(n, k, construction)
            .with_context(|| format!("Failed to construct the ({}, {}) code", n, k))?;
        let crc = crc
            .map(|poly| Crc::new(k, poly))
            .transpose()
            .context("Failed to build the CRC")?;
        if crc.is_none() && n_flips > 0 {
            warn!(n_flips, "no CRC to accept a flip, decoding with plain SC");
        }
        debug!(
            n,
            k,
            crc_size = crc.map_or(0, |c| c.size()),
            crc_poly = crc.map_or(0, |c| c.polynomial()),
            "link ready"
        );
        Ok(Self {
            mask,
            crc,
            n_flips,
            kernel,
        })
    }

    pub fn n(&self) -> usize {
        self.mask.n()
    }

    pub fn k(&self) -> usize {
        self.mask.k()
    }

    /// Information bits not spent on the CRC.
    pub fn payload_len(&self) -> usize {
        self.crc.map_or(self.k(), |crc| crc.payload_len())
    }

    /// Payload bits per channel use.
    pub fn rate(&self) -> f64 {
        self.payload_len() as f64 / self.n() as f64
    }

    /// A fresh decoder borrowing this link's mask.
    pub fn decoder(&self) -> Box<dyn FrameDecoder + Send + '_> {
        match self.kernel {
            KernelKind::MinSum => Box::new(ScFlipDecoder::<Crc, MinSum>::new(
                &self.mask,
                self.crc,
                self.n_flips,
            )),
            KernelKind::BoxPlus => Box::new(ScFlipDecoder::<Crc, BoxPlus>::new(
                &self.mask,
                self.crc,
                self.n_flips,
            )),
        }
    }

    /// Fills `frame` (K bits) with a random payload and its CRC.
    pub fn random_frame<R: Rng>(&self, rng: &mut R, frame: &mut [u8]) -> Result<()> {
        match self.crc {
            Some(crc) => {
                let payload: Vec<u8> = (0..crc.payload_len()).map(|_| rng.gen_range(0..2u8)).collect();
                crc.attach(&payload, frame)?;
            }
            None => frame.iter_mut().for_each(|b| *b = rng.gen_range(0..2u8)),
        }
        Ok(())
    }
}

/// Per-thread state of the decode loop.
pub struct Worker<'a> {
    link: &'a Link,
    decoder: Box<dyn FrameDecoder + Send + 'a>,
    codeword: Vec<u8>,
    llr: Vec<f32>,
    decoded: Vec<u8>,
}

impl<'a> Worker<'a> {
    pub fn new(link: &'a Link) -> Self {
        Self {
            link,
            decoder: link.decoder(),
            codeword: vec![0; link.n()],
            llr: vec![0.0; link.n()],
            decoded: vec![0; link.k()],
        }
    }

    /// Sends one K-bit frame through the channel and decodes it.
    ///
    /// Bit errors are counted over the payload only. Latency covers the
    /// decoder alone.
    pub fn run_frame<R: Rng>(
        &mut self,
        frame: &[u8],
        channel: &AwgnChannel,
        rng: &mut R,
    ) -> Result<FrameReport> {
        PolarEncoder::new(&self.link.mask).encode(frame, &mut self.codeword)?;
        channel.transmit(&self.codeword, &mut self.llr, rng);

        let start = Instant::now();
        let outcome = self.decoder.decode_frame(&self.llr, &mut self.decoded)?;
        let latency_ns = start.elapsed().as_nanos() as u64;

        let payload = self.link.payload_len();
        Ok(FrameReport {
            bit_errors: count_bit_errors(&frame[..payload], &self.decoded[..payload]),
            outcome,
            latency_ns,
        })
    }
}
