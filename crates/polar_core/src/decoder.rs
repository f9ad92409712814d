//! Successive-cancellation decoding.
//!
//! The decoder walks the recursion tree depth first. At an internal node the
//! f-kernel feeds the left child, the left subtree is decoded completely, the
//! g-kernel (conditioned on the left child's re-encoded decisions) feeds the
//! right child, and once both subtrees are done the node's decisions are
//! rebuilt as `[left ^ right, right]`, the encoder's butterfly applied to
//! hard bits. Leaves decide 0 when frozen and the h-kernel otherwise.

use crate::encoder::{check_len, gather};
use crate::frozen::FrozenMask;
use crate::kernel::{Kernel, MinSum};
use crate::tree::{NodeSpan, RecursionTree};
use crate::Result;
use core::marker::PhantomData;

/// Outcome of an integrity check on a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// An integrity check accepted the frame.
    Passed,
    /// No integrity check was available; the frame is taken as decoded.
    Unchecked,
    /// Every attempt failed the integrity check. The frame is a frame error
    /// for the caller to count, not an abort.
    Failed,
}

/// Result of decoding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Number of SC passes run, 1 for a first-pass decode.
    pub attempts: usize,
    pub status: FrameStatus,
    /// Leaf forced to its opposite value in the accepted attempt, if any.
    pub flipped: Option<usize>,
}

impl DecodeOutcome {
    pub(crate) fn first_pass(status: FrameStatus) -> Self {
        Self {
            attempts: 1,
            status,
            flipped: None,
        }
    }

    /// False only when the frame failed its integrity check.
    pub fn is_success(&self) -> bool {
        self.status != FrameStatus::Failed
    }
}

/// Frame-level decoding contract shared by every decoder variant.
///
/// The simulation driver holds decoders through this trait and hands each
/// worker its own instance.
pub trait FrameDecoder {
    /// Decodes N soft values into K information bits.
    fn decode_frame(&mut self, soft: &[f32], info_out: &mut [u8]) -> Result<DecodeOutcome>;

    /// The frozen mask the decoder was built for.
    fn mask(&self) -> &FrozenMask;
}

/// Successive-cancellation decoder.
///
/// Owns its recursion tree and scratch buffers, sized for N at
/// construction; decoding a frame performs no allocation. One instance
/// serves one thread: workers decoding in parallel each build their own and
/// share the mask.
///
/// # Type Parameters
///
/// * `K` - Kernel providing the f, g and h functions. Defaults to min-sum.
pub struct ScDecoder<'a, K: Kernel = MinSum> {
    /// Frozen mask shared with the encoder and the other decoders.
    mask: &'a FrozenMask,

    /// Per-level soft and hard buffers.
    tree: RecursionTree,

    /// Soft value each leaf saw during the last pass, indexed by position.
    ///
    /// Its magnitude is the confidence of the leaf decision, which SC-Flip
    /// uses to rank flip candidates.
    leaf_soft: Vec<f32>,

    /// Leaf decision to invert during the current pass.
    forced: Option<usize>,

    _kernel: PhantomData<K>,
}

impl<'a, K: Kernel> ScDecoder<'a, K> {
    /// Creates a decoder for the code described by `mask`.
    ///
    /// Allocates `log2(N) + 1` soft and hard buffers of N entries plus the
    /// leaf scratch. The decoder borrows the mask for its whole lifetime.
    pub fn new(mask: &'a FrozenMask) -> Self {
        let n = mask.n();
        Self {
            mask,
            tree: RecursionTree::new(n),
            leaf_soft: vec![0.0; n],
            forced: None,
            _kernel: PhantomData,
        }
    }

    pub fn mask(&self) -> &'a FrozenMask {
        self.mask
    }

    /// Runs one SC pass over `soft` (N values).
    pub fn run(&mut self, soft: &[f32]) -> Result<()> {
        self.run_with_flip(soft, None)
    }

    /// Runs one SC pass, inverting the natural decision of leaf `forced`.
    ///
    /// A forced frozen leaf is ignored: frozen leaves always decide 0. The
    /// inverted decision propagates to every later leaf exactly as a natural
    /// decision would.
    pub fn run_with_flip(&mut self, soft: &[f32], forced: Option<usize>) -> Result<()> {
        check_len(self.mask.n(), soft.len())?;
        self.tree.load_root(soft);
        self.forced = forced;
        let root = self.tree.root();
        self.decode_node(root);
        self.forced = None;
        Ok(())
    }

    fn decode_node(&mut self, node: NodeSpan) {
        if node.is_leaf() {
            self.decide_leaf(node);
            return;
        }

        let left = node.left();
        let right = node.right();
        let half = left.len;

        {
            let (parent, child) = self.tree.parent_and_child(node.level);
            let (a, b) = parent.soft[node.offset..node.offset + node.len].split_at(half);
            let out = &mut child.soft[left.offset..left.offset + half];
            for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
                *o = K::f(x, y);
            }
        }
        self.decode_node(left);

        {
            let (parent, child) = self.tree.parent_and_child(node.level);
            let (a, b) = parent.soft[node.offset..node.offset + node.len].split_at(half);
            let sums = &child.hard[left.offset..left.offset + half];
            let out = &mut child.soft[right.offset..right.offset + half];
            for (((o, &x), &y), &s) in out.iter_mut().zip(a).zip(b).zip(sums) {
                *o = K::g(x, y, s);
            }
        }
        self.decode_node(right);

        let (parent, child) = self.tree.parent_and_child(node.level);
        let (l, r) = child.hard[node.offset..node.offset + node.len].split_at(half);
        let (out_l, out_r) = parent.hard[node.offset..node.offset + node.len].split_at_mut(half);
        for (((ol, or), &bl), &br) in out_l.iter_mut().zip(out_r.iter_mut()).zip(l).zip(r) {
            *ol = bl ^ br;
            *or = br;
        }
    }

    #[inline(always)]
    fn decide_leaf(&mut self, leaf: NodeSpan) {
        let pos = leaf.offset;
        let level = self.tree.level_mut(leaf.level);
        let llr = level.soft[pos];
        let bit = if self.mask.is_frozen(pos) {
            0
        } else if self.forced == Some(pos) {
            K::h(llr) ^ 1
        } else {
            K::h(llr)
        };
        level.hard[pos] = bit;
        self.leaf_soft[pos] = llr;
    }

    /// Leaf decisions of the last pass (the decoded u vector, N bits).
    ///
    /// Frozen positions are always 0.
    pub fn decisions(&self) -> &[u8] {
        let leaves = self.tree.depth() - 1;
        &self.tree.level(leaves).hard
    }

    /// Re-encoded decisions of the last pass (the decoded codeword, N bits).
    pub fn codeword(&self) -> &[u8] {
        self.tree.root_hard()
    }

    /// Soft value seen by every leaf during the last pass.
    pub fn leaf_soft(&self) -> &[f32] {
        &self.leaf_soft
    }

    /// Copies the information bits of the last pass into `info_out`.
    pub fn extract_info(&self, info_out: &mut [u8]) -> Result<()> {
        check_len(self.mask.k(), info_out.len())?;
        gather(self.mask.info_positions(), self.decisions(), info_out);
        Ok(())
    }

    /// Decodes N soft values into K information bits.
    ///
    /// # Arguments
    ///
    /// * `soft` - Channel LLRs, N values
    /// * `info_out` - Output buffer of K bits
    ///
    /// # Returns
    ///
    /// `LengthMismatch` if either buffer has the wrong size.
    pub fn decode_into(&mut self, soft: &[f32], info_out: &mut [u8]) -> Result<()> {
        check_len(self.mask.k(), info_out.len())?;
        self.run(soft)?;
        self.extract_info(info_out)
    }

    /// Decodes N soft values into the N-bit codeword estimate.
    pub fn decode_codeword_into(&mut self, soft: &[f32], codeword_out: &mut [u8]) -> Result<()> {
        check_len(self.mask.n(), codeword_out.len())?;
        self.run(soft)?;
        codeword_out.copy_from_slice(self.codeword());
        Ok(())
    }

    /// Decodes into a freshly allocated information vector.
    pub fn decode(&mut self, soft: &[f32]) -> Result<Vec<u8>> {
        let mut info = vec![0u8; self.mask.k()];
        self.decode_into(soft, &mut info)?;
        Ok(info)
    }
}

impl<K: Kernel> FrameDecoder for ScDecoder<'_, K> {
    fn decode_frame(&mut self, soft: &[f32], info_out: &mut [u8]) -> Result<DecodeOutcome> {
        self.decode_into(soft, info_out)?;
        Ok(DecodeOutcome::first_pass(FrameStatus::Unchecked))
    }

    fn mask(&self) -> &FrozenMask {
        self.mask
    }
}
