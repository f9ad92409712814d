//! Recursion tree for successive-cancellation decoding.
//!
//! The tree of an N-bit code has `log2(N) + 1` levels. Level `d` holds
//! `2^d` nodes of `N >> d` entries each, stored back to back in one soft
//! buffer and one hard buffer of length N. Node `(d, j)` therefore owns
//! `[j * (N >> d), (j + 1) * (N >> d))` of its level, its two children own
//! the two halves of the same range one level down, and no two nodes of a
//! level overlap.

/// Buffers of one tree level.
#[derive(Debug, Clone)]
pub struct Level {
    /// Soft values (LLRs) of every node of the level, back to back.
    pub soft: Vec<f32>,

    /// Hard decisions of every node of the level. For an internal node these
    /// are the re-encoded decisions of its subtree, for a leaf the decided
    /// bit itself.
    pub hard: Vec<u8>,
}

/// Position of one node inside its level buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpan {
    pub level: usize,
    pub index: usize,
    pub offset: usize,
    pub len: usize,
}

impl NodeSpan {
    /// Span of the left child.
    pub fn left(&self) -> NodeSpan {
        NodeSpan {
            level: self.level + 1,
            index: 2 * self.index,
            offset: self.offset,
            len: self.len / 2,
        }
    }

    /// Span of the right child.
    pub fn right(&self) -> NodeSpan {
        NodeSpan {
            level: self.level + 1,
            index: 2 * self.index + 1,
            offset: self.offset + self.len / 2,
            len: self.len / 2,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.len == 1
    }
}

/// Arena holding the soft and hard buffers of every node.
///
/// Allocated once per decoder for a fixed N and overwritten on every frame.
#[derive(Debug, Clone)]
pub struct RecursionTree {
    n: usize,
    levels: Vec<Level>,
}

impl RecursionTree {
    /// Allocates the tree of an N-bit code. N must be a power of two.
    pub fn new(n: usize) -> Self {
        debug_assert!(n.is_power_of_two());
        let depth = n.trailing_zeros() as usize + 1;
        let levels = (0..depth)
            .map(|_| Level {
                soft: vec![0.0; n],
                hard: vec![0; n],
            })
            .collect();
        Self { n, levels }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of levels, `log2(N) + 1`.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Span of the root node.
    pub fn root(&self) -> NodeSpan {
        self.span(0, 0)
    }

    /// Span of node `index` at `level`.
    pub fn span(&self, level: usize, index: usize) -> NodeSpan {
        let len = self.n >> level;
        NodeSpan {
            level,
            index,
            offset: index * len,
            len,
        }
    }

    /// Copies the channel soft values into the root.
    pub fn load_root(&mut self, soft: &[f32]) {
        self.levels[0].soft.copy_from_slice(soft);
    }

    /// Re-encoded decisions of the whole tree, i.e. the decoded codeword.
    pub fn root_hard(&self) -> &[u8] {
        &self.levels[0].hard
    }

    pub fn level(&self, level: usize) -> &Level {
        &self.levels[level]
    }

    pub fn level_mut(&mut self, level: usize) -> &mut Level {
        &mut self.levels[level]
    }

    /// Mutable access to a level and the one below it at the same time.
    #[inline(always)]
    pub fn parent_and_child(&mut self, level: usize) -> (&mut Level, &mut Level) {
        let (upper, lower) = self.levels.split_at_mut(level + 1);
        (&mut upper[level], &mut lower[0])
    }
}
