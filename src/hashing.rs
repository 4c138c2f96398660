//! Deterministic byte hashing for feature fingerprints.
//!
//! Fingerprints are only comparable if every process (and every machine) hashes the
//! same feature to the same 64-bit value, so nothing here touches `RandomState` or
//! `DefaultHasher`.

use std::hash::Hasher;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A stable 64-bit hasher: FNV-1a over the input, finished with a 64-bit avalanche.
///
/// FNV-1a alone mixes poorly into the low bits, which matters for SimHash since every
/// output bit gets its own vote. The finalizer spreads each input byte over all 64 bits.
#[derive(Debug, Clone)]
pub struct StableHasher {
    state: u64,
}

impl StableHasher {
    /// Create a hasher at the FNV offset basis.
    pub fn new() -> Self {
        Self { state: FNV_OFFSET }
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        avalanche(self.state)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}

/// MurmurHash3 `fmix64`.
fn avalanche(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Hash a byte string to an unsigned 64-bit value.
///
/// Deterministic across runs and platforms; no seed.
pub fn unsigned_hash(bytes: &[u8]) -> u64 {
    let mut hasher = StableHasher::new();
    hasher.write(bytes);
    hasher.finish()
}
