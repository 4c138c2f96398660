//! Near-duplicate index over 64-bit fingerprints.
//!
//! The corpus keeps one [`Table`] per member of a [`CoveringFamily`]. Each table sorts the
//! same multiset of fingerprints under a different block permutation. A query within
//! `bits` differing bits of some stored fingerprint agrees with it exactly on all the
//! blocks of at least one member, so that table's prefix range contains it. Candidates
//! are then checked with the true Hamming distance, so results have neither false
//! positives nor false negatives within the threshold.
//!
//! # Example
//!
//! ```rust
//! use simhash_corpus::Corpus;
//!
//! let mut corpus = Corpus::new(6, 3).unwrap();
//! corpus.insert_bulk(&[0xDEAD_BEEF, 0x1234_5678_9ABC_DEF0]);
//!
//! // Two bits away from a stored fingerprint.
//! assert_eq!(corpus.find_first(0xDEAD_BEEF ^ 0b101), 0xDEAD_BEEF);
//! assert_eq!(corpus.find_any(0), None);
//! ```
//!
//! # Notes
//!
//! - [`Corpus::find_first`] returns `0` for "not found", which is indistinguishable from
//!   a stored `0`. Use [`Corpus::find_any`] when that matters.
//! - Mutation takes `&mut self`; share a corpus across threads behind a lock.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::blocks::{self, BlockLayout, CoveringFamily};
use crate::error::Result;
use crate::simhash::num_differing_bits;
use crate::table::Table;

/// Block/bit configuration for a [`Corpus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusConfig {
    /// Number of blocks the 64 bits are split into.
    pub blocks: usize,
    /// Maximum Hamming distance for a near-duplicate. Must be less than `blocks`.
    pub bits: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { blocks: 6, bits: 3 }
    }
}

impl CorpusConfig {
    /// Create a config.
    pub fn new(blocks: usize, bits: usize) -> Self {
        Self { blocks, bits }
    }

    /// Exact-match lookups only: a single table over the whole word.
    pub fn exact() -> Self {
        Self { blocks: 1, bits: 0 }
    }

    /// Narrower blocks: shorter candidate runs per probe, more tables to maintain.
    pub fn fine_grained() -> Self {
        Self {
            blocks: 8,
            ..Default::default()
        }
    }

    /// Check the block/bit counts without building anything.
    pub fn validate(&self) -> Result<()> {
        blocks::validate(self.blocks, self.bits)
    }

    /// Number of tables a corpus with this config maintains.
    pub fn num_tables(&self) -> u128 {
        CoveringFamily::binomial(self.blocks, self.blocks.saturating_sub(self.bits))
    }
}

/// A multiset of fingerprints supporting near-duplicate lookup.
#[derive(Debug, Clone)]
pub struct Corpus {
    config: CorpusConfig,
    layout: BlockLayout,
    tables: Vec<Table>,
}

impl Corpus {
    /// Create an empty corpus splitting fingerprints into `blocks` blocks and matching
    /// up to `bits` differing bits.
    ///
    /// The corpus keeps one table per `(blocks - bits)`-subset of blocks, so memory and
    /// insert cost grow as C(`blocks`, `blocks - bits`): 20 tables for `(6, 3)`, but
    /// about 1.8e18 for `(64, 32)`, which cannot be allocated. Check
    /// [`CorpusConfig::num_tables`] before building from untrusted parameters.
    pub fn new(blocks: usize, bits: usize) -> Result<Self> {
        Self::with_config(CorpusConfig::new(blocks, bits))
    }

    /// Create an empty corpus from a config.
    ///
    /// See [`Self::new`] for how the table count grows with the config.
    pub fn with_config(config: CorpusConfig) -> Result<Self> {
        let family = CoveringFamily::new(config.blocks, config.bits)?;
        let layout = BlockLayout::new(config.blocks)?;
        let tables = family
            .members()
            .iter()
            .map(|member| Table::new(&layout, member))
            .collect::<Result<Vec<Table>>>()?;
        tracing::debug!(
            blocks = config.blocks,
            bits = config.bits,
            tables = tables.len(),
            "created corpus"
        );
        Ok(Self {
            config,
            layout,
            tables,
        })
    }

    /// The configuration this corpus was built with.
    pub fn config(&self) -> CorpusConfig {
        self.config
    }

    /// Number of blocks.
    pub fn blocks(&self) -> usize {
        self.config.blocks
    }

    /// Maximum differing bits for a match.
    pub fn bits(&self) -> usize {
        self.config.bits
    }

    /// Block layout shared by every table.
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// The permuted tables, one per covering member.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Add one reference to `fp`.
    pub fn insert(&mut self, fp: u64) {
        for table in &mut self.tables {
            table.insert(fp);
        }
    }

    /// Add one reference to each fingerprint in `fps`.
    ///
    /// Equivalent to calling [`Self::insert`] for each element; duplicates in the batch
    /// count separately.
    pub fn insert_bulk(&mut self, fps: &[u64]) {
        tracing::trace!(count = fps.len(), tables = self.tables.len(), "bulk insert");
        self.tables
            .par_iter_mut()
            .for_each(|table| table.insert_bulk(fps));
    }

    /// Drop one reference to `fp`. Removing an absent fingerprint does nothing.
    pub fn remove(&mut self, fp: u64) {
        for table in &mut self.tables {
            table.remove(fp);
        }
    }

    /// Drop one reference to each fingerprint in `fps`.
    pub fn remove_bulk(&mut self, fps: &[u64]) {
        tracing::trace!(count = fps.len(), tables = self.tables.len(), "bulk remove");
        self.tables
            .par_iter_mut()
            .for_each(|table| table.remove_bulk(fps));
    }

    /// Stored fingerprints within `bits` of `query`, as found through one table.
    fn matches<'a>(&'a self, table: &'a Table, query: u64) -> impl Iterator<Item = u64> + 'a {
        let limit = self.config.bits as u32;
        table
            .candidates(table.permute(query))
            .map(move |p| table.unpermute(p))
            .filter(move |&fp| num_differing_bits(fp, query) <= limit)
    }

    /// First stored fingerprint within `bits` of `query`, if any.
    pub fn find_any(&self, query: u64) -> Option<u64> {
        self.tables
            .iter()
            .find_map(|table| self.matches(table, query).next())
    }

    /// First stored fingerprint within `bits` of `query`, or `0` if there is none.
    ///
    /// A stored `0` cannot be told apart from "not found"; see [`Self::find_any`].
    pub fn find_first(&self, query: u64) -> u64 {
        self.find_any(query).unwrap_or(0)
    }

    /// Every stored fingerprint within `bits` of `query`.
    pub fn find_all(&self, query: u64) -> BTreeSet<u64> {
        self.tables
            .iter()
            .flat_map(|table| self.matches(table, query))
            .collect()
    }

    /// [`Self::find_first`] for each query, in query order.
    pub fn find_first_bulk(&self, queries: &[u64]) -> Vec<u64> {
        tracing::trace!(count = queries.len(), "bulk find_first");
        queries.par_iter().map(|&q| self.find_first(q)).collect()
    }

    /// [`Self::find_all`] for each query, in query order.
    pub fn find_all_bulk(&self, queries: &[u64]) -> Vec<BTreeSet<u64>> {
        tracing::trace!(count = queries.len(), "bulk find_all");
        queries.par_iter().map(|&q| self.find_all(q)).collect()
    }

    /// Every fingerprint currently present (reference count above zero).
    pub fn hashes(&self) -> BTreeSet<u64> {
        self.tables
            .first()
            .map(|table| table.values().collect())
            .unwrap_or_default()
    }

    /// Reference count of `fp`.
    pub fn count(&self, fp: u64) -> u64 {
        self.tables.first().map_or(0, |table| table.count(fp))
    }

    /// True if `fp` itself is present.
    pub fn contains(&self, fp: u64) -> bool {
        self.count(fp) > 0
    }

    /// Number of distinct fingerprints present.
    pub fn len(&self) -> usize {
        self.tables.first().map_or(0, Table::len)
    }

    /// True if nothing is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn rejects_invalid_configs() {
        assert!(matches!(Corpus::new(3, 3), Err(Error::Configuration(_))));
        assert!(matches!(Corpus::new(0, 0), Err(Error::Configuration(_))));
        assert!(matches!(Corpus::new(65, 3), Err(Error::Configuration(_))));
        assert!(Corpus::new(4, 3).is_ok());
    }

    #[test]
    fn config_validation_matches_family_errors() {
        for (blocks, bits) in [(3, 3), (0, 0), (65, 3), (4, 9)] {
            let config = CorpusConfig::new(blocks, bits);
            assert_eq!(
                config.validate().unwrap_err(),
                CoveringFamily::new(blocks, bits).unwrap_err()
            );
            assert_eq!(
                Corpus::with_config(config).unwrap_err(),
                config.validate().unwrap_err()
            );
        }
        assert!(CorpusConfig::default().validate().is_ok());
    }

    #[test]
    fn table_count_is_known_before_building() {
        // Accepted, but far too many tables to allocate.
        let huge = CorpusConfig::new(64, 32);
        assert!(huge.validate().is_ok());
        assert!(huge.num_tables() > 1_000_000_000_000_000_000);
        assert_eq!(CorpusConfig::new(64, 1).num_tables(), 64);
    }

    #[test]
    fn one_table_per_member() {
        let corpus = Corpus::new(6, 3).unwrap();
        assert_eq!(corpus.tables().len(), 20);
        assert_eq!(CorpusConfig::default().num_tables(), 20);
        assert!(corpus.is_empty());
        assert_eq!(Corpus::with_config(CorpusConfig::exact()).unwrap().tables().len(), 1);
        assert_eq!(CorpusConfig::fine_grained().num_tables(), 56);
    }

    #[test]
    fn find_first_hits_within_threshold() {
        let mut corpus = Corpus::new(6, 3).unwrap();
        let stored = 0xF0F0_F0F0_0F0F_0F0F;
        corpus.insert(stored);
        assert_eq!(corpus.find_first(stored), stored);
        assert_eq!(corpus.find_first(stored ^ 0b111), stored);
        assert_eq!(corpus.find_first(stored ^ 0b1111), 0);
        assert_eq!(corpus.find_first(stored ^ (1 << 63) ^ (1 << 31) ^ 1), stored);
    }

    #[test]
    fn zero_sentinel_is_ambiguous() {
        let mut corpus = Corpus::new(6, 3).unwrap();
        corpus.insert(0);
        assert_eq!(corpus.find_first(1), 0);
        assert_eq!(corpus.find_any(1), Some(0));
        assert_eq!(corpus.find_any(u64::MAX), None);
    }

    #[test]
    fn reference_counts_need_matching_removes() {
        let mut corpus = Corpus::new(6, 3).unwrap();
        corpus.insert(42);
        corpus.insert_bulk(&[42]);
        assert_eq!(corpus.count(42), 2);
        corpus.remove(42);
        assert!(corpus.contains(42));
        corpus.remove_bulk(&[42]);
        assert!(!corpus.contains(42));
        corpus.remove(42);
        assert_eq!(corpus.count(42), 0);
        assert!(corpus.hashes().is_empty());
    }

    #[test]
    fn find_all_filters_by_true_distance() {
        let mut corpus = Corpus::new(4, 2).unwrap();
        let q = 0u64;
        corpus.insert_bulk(&[1, 3, 7, 1 << 40, (1 << 40) | (1 << 20)]);
        let expected: BTreeSet<u64> = [1, 3, 1 << 40, (1 << 40) | (1 << 20)].into_iter().collect();
        assert_eq!(corpus.find_all(q), expected);
    }

    #[test]
    fn bulk_queries_preserve_order() {
        let mut corpus = Corpus::new(6, 3).unwrap();
        corpus.insert_bulk(&[0xFF, 0xFF00]);
        assert_eq!(
            corpus.find_first_bulk(&[0xFE, 0x1234_0000_0000_0000, 0xFF01]),
            vec![0xFF, 0, 0xFF00]
        );
        let all = corpus.find_all_bulk(&[0xFF, 0]);
        assert_eq!(all.len(), 2);
        assert!(all[0].contains(&0xFF));
        assert!(all[1].is_empty());
    }

    #[test]
    fn tables_stay_in_lockstep() {
        let mut corpus = Corpus::new(5, 2).unwrap();
        corpus.insert_bulk(&(0..500u64).map(|i| i * 0x0101_0101).collect::<Vec<_>>());
        corpus.remove(0x0101_0101);
        corpus.insert(u64::MAX);
        let reference = corpus.hashes();
        for table in corpus.tables() {
            assert_eq!(table.values().collect::<BTreeSet<_>>(), reference);
        }
        assert_eq!(corpus.len(), 500);
    }
}
