//! One permuted, sorted view of the corpus.

use std::collections::BTreeMap;

use crate::blocks::BlockLayout;
use crate::error::Result;
use crate::permutation::Permutation;

/// Bulk batches at least this fraction of the table size are merged and rebuilt
/// rather than applied entry by entry.
const REBUILD_RATIO: usize = 8;

/// Reference-counted sorted multiset of permuted fingerprints for one covering member.
#[derive(Debug, Clone)]
pub struct Table {
    member: Vec<usize>,
    permutation: Permutation,
    prefix_mask: u64,
    entries: BTreeMap<u64, u64>,
}

impl Table {
    /// Create an empty table for `member` over `layout`.
    ///
    /// Fails if `member` is not a strictly increasing list of indices into `layout`.
    pub fn new(layout: &BlockLayout, member: &[usize]) -> Result<Self> {
        let permutation = Permutation::build(layout, member)?;
        let prefix_mask = permutation.prefix_mask();
        Ok(Self {
            member: member.to_vec(),
            permutation,
            prefix_mask,
            entries: BTreeMap::new(),
        })
    }

    /// Block indices lifted to the top by this table's permutation.
    pub fn member(&self) -> &[usize] {
        &self.member
    }

    /// Permute a fingerprint into this table's order.
    pub fn permute(&self, fp: u64) -> u64 {
        self.permutation.apply(fp)
    }

    /// Recover the original fingerprint from a permuted value.
    pub fn unpermute(&self, permuted: u64) -> u64 {
        self.permutation.invert(permuted)
    }

    /// Add one reference to `fp`.
    pub fn insert(&mut self, fp: u64) {
        let key = self.permute(fp);
        *self.entries.entry(key).or_insert(0) += 1;
    }

    /// Drop one reference to `fp`. Absent fingerprints are ignored.
    pub fn remove(&mut self, fp: u64) {
        let key = self.permute(fp);
        if let Some(count) = self.entries.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.entries.remove(&key);
            }
        }
    }

    /// Insert a batch, sorting it once instead of rebalancing per element.
    pub fn insert_bulk(&mut self, fps: &[u64]) {
        let runs = self.sorted_runs(fps);
        if runs.len() * REBUILD_RATIO < self.entries.len() {
            for (key, n) in runs {
                *self.entries.entry(key).or_insert(0) += n;
            }
            return;
        }
        let existing = std::mem::take(&mut self.entries);
        self.entries = merge_runs(existing.into_iter(), runs.into_iter()).collect();
    }

    /// Remove a batch. Counts never go below zero.
    pub fn remove_bulk(&mut self, fps: &[u64]) {
        let runs = self.sorted_runs(fps);
        if runs.len() * REBUILD_RATIO < self.entries.len() {
            for (key, n) in runs {
                if let Some(count) = self.entries.get_mut(&key) {
                    if *count > n {
                        *count -= n;
                    } else {
                        self.entries.remove(&key);
                    }
                }
            }
            return;
        }
        let existing = std::mem::take(&mut self.entries);
        self.entries = subtract_runs(existing.into_iter(), runs.into_iter()).collect();
    }

    /// Permute, sort and coalesce a batch into `(permuted, occurrences)` runs.
    fn sorted_runs(&self, fps: &[u64]) -> Vec<(u64, u64)> {
        let mut keys: Vec<u64> = fps.iter().map(|&fp| self.permute(fp)).collect();
        keys.sort_unstable();
        let mut runs: Vec<(u64, u64)> = Vec::with_capacity(keys.len());
        for key in keys {
            match runs.last_mut() {
                Some((last, n)) if *last == key => *n += 1,
                _ => runs.push((key, 1)),
            }
        }
        runs
    }

    /// Permuted values sharing `permuted`'s prefix, in ascending order.
    pub fn candidates(&self, permuted: u64) -> impl Iterator<Item = u64> + '_ {
        let low = permuted & self.prefix_mask;
        let high = permuted | !self.prefix_mask;
        self.entries.range(low..=high).map(|(&k, _)| k)
    }

    /// Reference count of `fp` (0 if absent).
    pub fn count(&self, fp: u64) -> u64 {
        self.entries.get(&self.permute(fp)).copied().unwrap_or(0)
    }

    /// Present fingerprints, unpermuted, in this table's sort order.
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().map(move |&k| self.unpermute(k))
    }

    /// Number of distinct fingerprints present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no fingerprint is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge two ascending `(key, count)` streams, summing counts on equal keys.
fn merge_runs<A, B>(a: A, b: B) -> impl Iterator<Item = (u64, u64)>
where
    A: Iterator<Item = (u64, u64)>,
    B: Iterator<Item = (u64, u64)>,
{
    let mut a = a.peekable();
    let mut b = b.peekable();
    std::iter::from_fn(move || match (a.peek(), b.peek()) {
        (Some(&(ka, na)), Some(&(kb, nb))) => {
            if ka < kb {
                a.next()
            } else if kb < ka {
                b.next()
            } else {
                a.next();
                b.next();
                Some((ka, na + nb))
            }
        }
        (Some(_), None) => a.next(),
        (None, Some(_)) => b.next(),
        (None, None) => None,
    })
}

/// Subtract ascending `(key, count)` runs from ascending `entries`, dropping keys whose
/// count reaches zero. Keys only present in `runs` are ignored.
fn subtract_runs<A, B>(entries: A, runs: B) -> impl Iterator<Item = (u64, u64)>
where
    A: Iterator<Item = (u64, u64)>,
    B: Iterator<Item = (u64, u64)>,
{
    let mut runs = runs.peekable();
    entries.filter_map(move |(key, count)| {
        while runs.next_if(|&(k, _)| k < key).is_some() {}
        match runs.next_if(|&(k, _)| k == key) {
            Some((_, n)) if n >= count => None,
            Some((_, n)) => Some((key, count - n)),
            None => Some((key, count)),
        }
    })
}
