//! Batch self-join: all near-duplicate pairs within one list of fingerprints.
//!
//! Same covering argument as [`Corpus`](crate::Corpus), without a persistent index. For
//! each covering member the whole list is permuted and sorted once; fingerprints that
//! share the member's prefix land in one contiguous run, and only pairs inside a run are
//! compared.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::blocks::{BlockLayout, CoveringFamily};
use crate::error::Result;
use crate::permutation::Permutation;
use crate::simhash::num_differing_bits;

/// Every pair of distinct input values within `bits` differing bits of each other.
///
/// Pairs are `(smaller, larger)` and the result is sorted. Repeated input values are
/// treated as one. Fails with a configuration error under the same conditions as
/// [`Corpus::new`](crate::Corpus::new).
pub fn find_all(fingerprints: &[u64], blocks: usize, bits: usize) -> Result<Vec<(u64, u64)>> {
    let layout = BlockLayout::new(blocks)?;
    let family = CoveringFamily::new(blocks, bits)?;

    let mut distinct = fingerprints.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    tracing::debug!(
        inputs = fingerprints.len(),
        distinct = distinct.len(),
        members = family.len(),
        "batch near-duplicate search"
    );

    let limit = bits as u32;
    let permutations = family
        .members()
        .iter()
        .map(|member| Permutation::build(&layout, member))
        .collect::<Result<Vec<_>>>()?;
    let pairs: BTreeSet<(u64, u64)> = permutations
        .par_iter()
        .map(|permutation| pairs_for_member(permutation, &distinct, limit))
        .reduce(BTreeSet::new, |mut a, b| {
            a.extend(b);
            a
        });

    Ok(pairs.into_iter().collect())
}

fn pairs_for_member(permutation: &Permutation, values: &[u64], limit: u32) -> BTreeSet<(u64, u64)> {
    let prefix = permutation.prefix_mask();
    let mut permuted: Vec<u64> = values.iter().map(|&v| permutation.apply(v)).collect();
    permuted.sort_unstable();

    let mut out = BTreeSet::new();
    for run in permuted.chunk_by(|a, b| a & prefix == b & prefix) {
        for (i, &a) in run.iter().enumerate() {
            for &b in &run[i + 1..] {
                // Permutations preserve Hamming distance.
                if num_differing_bits(a, b) <= limit {
                    let (x, y) = (permutation.invert(a), permutation.invert(b));
                    out.insert((x.min(y), x.max(y)));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn brute_force(values: &[u64], bits: u32) -> Vec<(u64, u64)> {
        let mut distinct = values.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        let mut out = Vec::new();
        for (i, &a) in distinct.iter().enumerate() {
            for &b in &distinct[i + 1..] {
                if num_differing_bits(a, b) <= bits {
                    out.push((a, b));
                }
            }
        }
        out
    }

    #[test]
    fn empty_and_single_inputs() {
        assert!(find_all(&[], 6, 3).unwrap().is_empty());
        assert!(find_all(&[5], 6, 3).unwrap().is_empty());
        assert!(find_all(&[5, 5, 5], 6, 3).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_config() {
        assert!(matches!(find_all(&[1, 2], 3, 3), Err(Error::Configuration(_))));
        assert!(matches!(find_all(&[1, 2], 0, 0), Err(Error::Configuration(_))));
    }

    #[test]
    fn matches_brute_force() {
        let mut values: Vec<u64> = (0..64u64).map(|i| 0x5555_0000_AAAA_0000 ^ (1 << i)).collect();
        values.extend((0..40u64).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15)));
        values.push(0x5555_0000_AAAA_0000 ^ 0b111);
        for blocks in 4..=8 {
            assert_eq!(find_all(&values, blocks, 3).unwrap(), brute_force(&values, 3));
        }
    }

    #[test]
    fn pairs_are_ordered_small_first() {
        let pairs = find_all(&[0xFF00, 0xFF01, 0x0F01], 6, 3).unwrap();
        assert_eq!(pairs, vec![(0xFF00, 0xFF01)]);
    }
}
