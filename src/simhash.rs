//! SimHash arithmetic: Hamming distance and majority-vote combination.
//!
//! SimHash (Charikar, 2002) maps a bag of hashed features to a 64-bit fingerprint such that
//! similar bags have small Hamming distance. Each output bit is a vote over the
//! corresponding bit of every feature hash.

use crate::error::Result;
use crate::hashing::unsigned_hash;
use crate::shingle::shingle;

/// Number of bit positions in which `a` and `b` differ (XOR + popcount).
#[inline]
pub fn num_differing_bits(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Combine feature hashes into one fingerprint by per-bit majority vote.
///
/// A bit is set iff strictly more inputs have it set than clear. Ties (including the
/// empty input) leave the bit clear.
pub fn compute(hashes: &[u64]) -> u64 {
    let mut acc = [0i64; 64];
    for &h in hashes {
        for (i, slot) in acc.iter_mut().enumerate() {
            if (h >> i) & 1 == 1 {
                *slot += 1;
            } else {
                *slot -= 1;
            }
        }
    }
    collapse(acc.iter().map(|&v| v > 0))
}

/// Weighted form of [`compute`]: each `(feature_hash, weight)` votes with `weight`.
pub fn compute_weighted(features: &[(u64, f32)]) -> u64 {
    let mut acc = [0f32; 64];
    for &(h, w) in features {
        for (i, slot) in acc.iter_mut().enumerate() {
            if (h >> i) & 1 == 1 {
                *slot += w;
            } else {
                *slot -= w;
            }
        }
    }
    collapse(acc.iter().map(|&v| v > 0.0))
}

fn collapse(bits: impl Iterator<Item = bool>) -> u64 {
    let mut out = 0u64;
    for (i, set) in bits.enumerate() {
        if set {
            out |= 1u64 << i;
        }
    }
    out
}

/// Fingerprint free text.
///
/// Lowercases, drops everything that is not a word character, takes character shingles
/// of `window` over the remaining text, hashes each with [`unsigned_hash`] and combines
/// the hashes with [`compute`].
pub fn fingerprint_text(text: &str, window: usize) -> Result<u64> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let hashes: Vec<u64> = shingle(normalized.chars(), window)?
        .map(|w| unsigned_hash(w.into_iter().collect::<String>().as_bytes()))
        .collect();
    Ok(compute(&hashes))
}
