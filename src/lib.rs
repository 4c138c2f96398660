//! `simhash-corpus`: near-duplicate lookup over 64-bit SimHash fingerprints.
//!
//! Given fingerprints of previously seen documents, answer "is anything stored within
//! `k` differing bits of this one?" and "what is?" without comparing against every
//! stored fingerprint. The index follows Manku et al. (2007): split the 64 bits into
//! blocks, keep one sorted table per way of choosing `blocks - k` of them, and search
//! each table by exact prefix.
//!
//! - [`simhash`]: Hamming distance and majority-vote fingerprint combination
//! - [`hashing`], [`shingle`]: deterministic feature hashing and sliding windows
//! - [`blocks`], [`permutation`], [`table`]: the index building blocks
//! - [`corpus`]: the incremental index
//! - [`dedup`]: one-shot pairwise near-duplicate search over a batch
//!
//! ```rust
//! use simhash_corpus::{dedup, simhash, Corpus};
//!
//! let a = simhash::compute(&[0xABCD, 0xBCDE, 0xCDEF]);
//! assert_eq!(a, 0xADCF);
//!
//! let mut corpus = Corpus::new(6, 3).unwrap();
//! corpus.insert(a);
//! assert!(corpus.find_all(a ^ 0b11).contains(&a));
//!
//! let pairs = dedup::find_all(&[0xFF, 0xEF, 0xFF00], 6, 3).unwrap();
//! assert_eq!(pairs, vec![(0xEF, 0xFF)]);
//! ```

#![warn(missing_docs)]

pub mod blocks;
pub mod corpus;
pub mod dedup;
pub mod error;
pub mod hashing;
pub mod permutation;
pub mod shingle;
pub mod simhash;
pub mod table;

pub use blocks::{Block, BlockLayout, CoveringFamily};
pub use corpus::{Corpus, CorpusConfig};
pub use error::{Error, Result};
pub use hashing::{unsigned_hash, StableHasher};
pub use permutation::Permutation;
pub use shingle::{shingle, Shingles};
pub use simhash::{compute, compute_weighted, fingerprint_text, num_differing_bits};
pub use table::Table;
