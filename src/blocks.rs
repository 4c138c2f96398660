//! Block partitions of the 64-bit width and the covering family built over them.
//!
//! Two fingerprints within `k` bits of each other differ in at most `k` blocks. If every
//! set of `k` blocks is avoided by some `(b - k)`-subset in the family, that subset's bits
//! agree exactly between the two fingerprints. Sorting by those bits first turns the
//! near-duplicate search into an exact prefix search.

use crate::error::{Error, Result};

/// Width of a fingerprint in bits.
pub const FINGERPRINT_BITS: u32 = 64;

/// Families larger than this still build, but cost one table apiece.
pub const LARGE_FAMILY_WARN: usize = 10_000;

/// A contiguous run of bit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Position of the least-significant bit in the block.
    pub offset: u32,
    /// Number of bits in the block.
    pub width: u32,
}

impl Block {
    /// Bitmask selecting this block's positions.
    pub fn mask(&self) -> u64 {
        low_bits(self.width) << self.offset
    }
}

/// Check a block count on its own.
pub fn validate_block_count(blocks: usize) -> Result<()> {
    if blocks == 0 || blocks > FINGERPRINT_BITS as usize {
        return Err(Error::Configuration(format!(
            "block count must be in [1, 64], got {blocks}"
        )));
    }
    Ok(())
}

/// Check a block/bit configuration: `1 <= blocks <= 64` and `bits < blocks`.
pub fn validate(blocks: usize, bits: usize) -> Result<()> {
    validate_block_count(blocks)?;
    if bits >= blocks {
        return Err(Error::Configuration(format!(
            "differing bits ({bits}) must be fewer than blocks ({blocks})"
        )));
    }
    Ok(())
}

pub(crate) fn low_bits(width: u32) -> u64 {
    if width >= FINGERPRINT_BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Partition of bit positions `0..64` into near-equal contiguous blocks.
///
/// Block 0 is the most-significant block. When 64 does not divide evenly, the leading
/// blocks are one bit wider than the trailing ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    blocks: Vec<Block>,
}

impl BlockLayout {
    /// Split 64 bits into `count` blocks.
    pub fn new(count: usize) -> Result<Self> {
        validate_block_count(count)?;
        let count_u32 = count as u32;
        let q = FINGERPRINT_BITS / count_u32;
        let r = FINGERPRINT_BITS % count_u32;

        let mut top = FINGERPRINT_BITS;
        let blocks = (0..count_u32)
            .map(|i| {
                let width = q + u32::from(i < r);
                top -= width;
                Block { offset: top, width }
            })
            .collect();
        Ok(Self { blocks })
    }

    /// Blocks in order, most significant first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false for a constructed layout.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// All `(b - k)`-subsets of block indices, in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveringFamily {
    blocks: usize,
    bits: usize,
    members: Vec<Vec<usize>>,
}

impl CoveringFamily {
    /// Build the complete family for `blocks` blocks tolerating `bits` differing bits.
    pub fn new(blocks: usize, bits: usize) -> Result<Self> {
        validate(blocks, bits)?;

        let size = blocks - bits;
        let expected = Self::binomial(blocks, size);
        if expected > LARGE_FAMILY_WARN as u128 {
            tracing::warn!(
                blocks,
                bits,
                tables = %expected,
                "covering family is very large; expect one table per member"
            );
        }

        let members = combinations(blocks, size);
        tracing::debug!(blocks, bits, members = members.len(), "built covering family");
        Ok(Self {
            blocks,
            bits,
            members,
        })
    }

    /// `n` choose `k`, saturating at `u128::MAX`.
    pub fn binomial(n: usize, k: usize) -> u128 {
        if k > n {
            return 0;
        }
        let k = k.min(n - k);
        let mut acc: u128 = 1;
        for i in 0..k {
            // acc * (n - i) / (i + 1) stays integral at every step.
            acc = match acc.checked_mul((n - i) as u128) {
                Some(v) => v / (i as u128 + 1),
                None => return u128::MAX,
            };
        }
        acc
    }

    /// Family members; each is a sorted list of block indices.
    pub fn members(&self) -> &[Vec<usize>] {
        &self.members
    }

    /// Number of blocks the family is defined over.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Tolerated number of differing bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a constructed family.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Exhaustively check that every set of at most `k` blocks is avoided by some member.
    ///
    /// Exponential in the block count; meant for tests and small layouts.
    pub fn covers(&self, k: usize) -> bool {
        let masks: Vec<u64> = self
            .members
            .iter()
            .map(|m| m.iter().fold(0u64, |acc, &b| acc | (1u64 << b)))
            .collect();
        (0..=k.min(self.blocks)).all(|size| {
            combinations(self.blocks, size).iter().all(|disturbed| {
                let d = disturbed.iter().fold(0u64, |acc, &b| acc | (1u64 << b));
                masks.iter().any(|m| m & d == 0)
            })
        })
    }
}

/// Every `k`-subset of `0..n` in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // Rightmost position that can still advance.
        let Some(pos) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
            return out;
        };
        idx[pos] += 1;
        for j in pos + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}
