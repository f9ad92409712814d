//! Core polar-code algorithms and data structures.
//!
//! This crate provides the polar-code core of the toolbox: reliability
//! ranking and frozen-set construction, the encode transform, the recursion
//! tree that backs successive-cancellation decoding, the SC decoder itself
//! and its bounded bit-flipping extension (SC-Flip). All decoders are
//! single-threaded objects that allocate once and are reused frame after
//! frame; the frozen mask they share is immutable and can be read from any
//! number of threads.

use thiserror::Error;

/// Reliability ranking of bit-channels.
///
/// Orders the N bit-channel indices from least to most reliable using one
/// of the interchangeable construction methods (Gaussian approximation,
/// standardized table, external error bounds, erasure-channel recursion or
/// an explicit channel order). Runs once per code configuration and is not
/// on any hot path.
pub mod reliability;

/// Frozen mask construction and storage.
///
/// Thresholds a reliability ranking into the N-entry frozen mask and derives
/// the ascending list of information positions. The mask is the single
/// immutable structure that the encoder and every decoder instance borrow.
pub mod frozen;

/// Polar encoder and the recursive XOR transform.
///
/// Scatters information bits into the non-frozen positions and applies the
/// in-place butterfly transform. Also provides the inverse scatter and a
/// codeword-membership check used by tests and sanity checks.
pub mod encoder;

/// Soft-value kernels used by successive-cancellation decoding.
///
/// The f, g and h functions are bound at decoder construction through a
/// generic parameter so that the hot loop is monomorphized for one kernel.
pub mod kernel;

/// Arena-backed recursion tree for successive-cancellation decoding.
///
/// Stores one soft buffer and one hard buffer per tree level. Node
/// `(level, index)` owns a contiguous, disjoint slice of its level, so
/// ownership stays tree-shaped without any pointer-linked nodes.
pub mod tree;

/// Successive-cancellation decoder.
///
/// Walks the recursion tree depth first, left subtree before right subtree,
/// producing one hard decision per leaf. Also defines the frame-decoding
/// contract shared by every decoder variant.
pub mod decoder;

/// SC-Flip decoder.
///
/// Composes an SC decoder with an integrity check and retries a bounded
/// number of times, forcing the least confident information decision to its
/// opposite value on each retry.
pub mod flip;

/// Integrity-check capability consumed by SC-Flip.
///
/// Defines the `check(candidate) -> bool` contract and a polynomial cyclic
/// redundancy check that implements it.
pub mod integrity;

pub use decoder::{DecodeOutcome, FrameDecoder, FrameStatus, ScDecoder};
pub use encoder::{PolarEncoder, polar_transform};
pub use flip::ScFlipDecoder;
pub use frozen::FrozenMask;
pub use integrity::{Crc, IntegrityCheck};
pub use kernel::{BoxPlus, Kernel, MinSum};
pub use reliability::{Construction, ReliabilityOrder};

/// Error types returned by polar-code construction and decoding.
///
/// Configuration errors (bad lengths, rates or noise values) and resource
/// errors (missing or malformed external reliability data) are fatal and surface at
/// construction time. A frame that fails its integrity check after every
/// flip attempt is not an error: it is reported through
/// [`FrameStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolarError {
    /// The code length is not a power of two.
    #[error("code length {n} is not a power of two")]
    InvalidSize { n: usize },

    /// The number of information bits is zero or exceeds the code length.
    #[error("invalid code rate: K = {k} for N = {n}")]
    InvalidRate { k: usize, n: usize },

    /// The noise parameter is out of range for the construction method.
    ///
    /// Gaussian approximation needs a finite, strictly positive standard
    /// deviation; the erasure recursion needs a probability in (0, 1).
    #[error("invalid noise parameter {value} for the {method} construction")]
    InvalidNoise { method: &'static str, value: f64 },

    /// The standardized reliability table does not cover the code length.
    #[error("reliability table covers N <= {max}, requested N = {n}")]
    TableTooShort { n: usize, max: usize },

    /// The integrity check cannot be built for this frame size.
    #[error("invalid integrity check: {0}")]
    InvalidCrc(String),

    /// An input or output buffer has the wrong length.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// External reliability data is malformed.
    ///
    /// Raised when a loaded ranking does not cover every bit-channel exactly
    /// once, has the wrong length, or contains non-finite values.
    #[error("malformed reliability data: {0}")]
    MalformedResource(String),

    /// External reliability data could not be read.
    #[error("cannot read reliability data {path}: {reason}")]
    MissingResource { path: String, reason: String },
}

impl PolarError {
    /// Whether the error comes from external data rather than configuration.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            PolarError::MalformedResource(_) | PolarError::MissingResource { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, PolarError>;

/// Builds the frozen mask of an (N, K) code with the given construction.
///
/// Convenience wrapper around [`FrozenMask::build`].
pub fn build_frozen_mask(n: usize, k: usize, construction: &Construction) -> Result<FrozenMask> {
    FrozenMask::build(n, k, construction)
}

/// Encodes K information bits into an N-bit codeword.
///
/// Allocates the output; use [`PolarEncoder::encode`] to write into a
/// caller-owned buffer.
pub fn encode(info: &[u8], mask: &FrozenMask) -> Result<Vec<u8>> {
    PolarEncoder::new(mask).encode_to_vec(info)
}

/// Decodes one frame of soft values with SC-Flip and returns the
/// information bits with a success flag.
///
/// Builds a fresh decoder for the call, which allocates its recursion tree.
/// Simulation loops should keep a [`ScFlipDecoder`] alive instead. Without
/// an integrity check the flip budget is forced to zero and the frame is
/// reported as successful, since nothing can contradict it.
pub fn decode<C: IntegrityCheck>(
    soft: &[f32],
    mask: &FrozenMask,
    n_flips: usize,
    check: Option<C>,
) -> Result<(Vec<u8>, bool)> {
    let mut decoder = ScFlipDecoder::<C, MinSum>::new(mask, check, n_flips);
    let mut info = vec![0u8; mask.k()];
    let outcome = decoder.decode_into(soft, &mut info)?;
    Ok((info, outcome.is_success()))
}
