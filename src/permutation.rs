//! Block-wise bit permutations.
//!
//! Every block is contiguous, so moving it is a mask and a shift; a permutation is just
//! the list of those per-block moves.

use crate::blocks::{Block, BlockLayout, FINGERPRINT_BITS};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Move {
    /// Source positions in the original fingerprint.
    forward: u64,
    /// The same positions after the move.
    reverse: u64,
    /// Signed distance to shift left (negative shifts right).
    shift: i32,
}

#[inline]
fn shift_by(x: u64, shift: i32) -> u64 {
    if shift >= 0 {
        x << shift
    } else {
        x >> -shift
    }
}

/// Bijection on bit positions that lifts a chosen set of blocks to the top.
///
/// Chosen blocks keep their relative order at the most-significant end; the remaining
/// blocks follow in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    moves: Vec<Move>,
    prefix_width: u32,
}

impl Permutation {
    /// Build the permutation for `member`, a list of block indices into `layout`.
    ///
    /// Indices must be strictly increasing and below `layout.len()`, as produced by a
    /// [`CoveringFamily`](crate::blocks::CoveringFamily) over the same block count.
    /// Anything else is a [`Error::Configuration`].
    pub fn build(layout: &BlockLayout, member: &[usize]) -> Result<Self> {
        let blocks = layout.blocks();
        if member.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Configuration(format!(
                "block indices must be strictly increasing, got {member:?}"
            )));
        }
        if let Some(&bad) = member.iter().find(|&&i| i >= blocks.len()) {
            return Err(Error::Configuration(format!(
                "block index {bad} out of range for {} blocks",
                blocks.len()
            )));
        }
        let chosen: Vec<&Block> = member.iter().map(|&i| &blocks[i]).collect();
        let rest = blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| !member.contains(i))
            .map(|(_, b)| b);

        let prefix_width: u32 = chosen.iter().map(|b| b.width).sum();

        let mut top = FINGERPRINT_BITS;
        let moves = chosen
            .into_iter()
            .chain(rest)
            .map(|block| {
                top -= block.width;
                let shift = top as i32 - block.offset as i32;
                let forward = block.mask();
                Move {
                    forward,
                    reverse: shift_by(forward, shift),
                    shift,
                }
            })
            .collect();

        Ok(Self {
            moves,
            prefix_width,
        })
    }

    /// Permute a fingerprint.
    pub fn apply(&self, x: u64) -> u64 {
        self.moves
            .iter()
            .fold(0, |acc, m| acc | shift_by(x & m.forward, m.shift))
    }

    /// Undo [`Self::apply`].
    pub fn invert(&self, x: u64) -> u64 {
        self.moves
            .iter()
            .fold(0, |acc, m| acc | shift_by(x & m.reverse, -m.shift))
    }

    /// Number of high-order bits occupied by the chosen blocks.
    pub fn prefix_width(&self) -> u32 {
        self.prefix_width
    }

    /// Mask over the high-order bits occupied by the chosen blocks.
    pub fn prefix_mask(&self) -> u64 {
        match self.prefix_width {
            0 => 0,
            w if w >= FINGERPRINT_BITS => u64::MAX,
            w => u64::MAX << (FINGERPRINT_BITS - w),
        }
    }
}
