//! Successive-cancellation kernels.
//!
//! Soft values are LLRs: positive favours bit 0, negative favours bit 1.
//! Kernels are zero-sized types used as a generic parameter of the
//! decoders, so the choice is made once at construction and costs nothing
//! per call.

/// The f/g/h functions of SC decoding.
pub trait Kernel {
    /// Combines the two halves of a parent block for the left child.
    fn f(a: f32, b: f32) -> f32;

    /// Combines the two halves for the right child, given the re-encoded
    /// hard decision `partial_sum` of the left child at the same offset.
    #[inline(always)]
    fn g(a: f32, b: f32, partial_sum: u8) -> f32 {
        if partial_sum == 0 { b + a } else { b - a }
    }

    /// Hard decision of a leaf. Zero (of either sign) decides 0.
    #[inline(always)]
    fn h(llr: f32) -> u8 {
        (llr < 0.0) as u8
    }
}

/// Min-sum approximation: `sign(a) sign(b) min(|a|, |b|)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinSum;

impl Kernel for MinSum {
    #[inline(always)]
    fn f(a: f32, b: f32) -> f32 {
        let magnitude = a.abs().min(b.abs());
        if (a < 0.0) != (b < 0.0) {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Exact box-plus, evaluated as min-sum plus two correction terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxPlus;

impl Kernel for BoxPlus {
    #[inline(always)]
    fn f(a: f32, b: f32) -> f32 {
        let approx = MinSum::f(a, b);
        if !(a.is_finite() && b.is_finite()) {
            return approx;
        }
        approx + (-(a + b).abs()).exp().ln_1p() - (-(a - b).abs()).exp().ln_1p()
    }
}
