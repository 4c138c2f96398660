//! Sliding-window shingles over a token stream.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{Error, Result};

/// Lazily yields every run of `window` consecutive tokens, oldest token first.
///
/// Cloning a `Shingles` (when the source iterator is `Clone`) gives an independent
/// cursor, so the sequence can be walked again from wherever the clone was taken.
pub struct Shingles<I: Iterator> {
    tokens: I,
    window: usize,
    current: VecDeque<I::Item>,
}

impl<I> Clone for Shingles<I>
where
    I: Iterator + Clone,
    I::Item: Clone,
{
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            window: self.window,
            current: self.current.clone(),
        }
    }
}

impl<I> fmt::Debug for Shingles<I>
where
    I: Iterator,
    I::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shingles")
            .field("window", &self.window)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<I> Iterator for Shingles<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        for token in self.tokens.by_ref() {
            self.current.push_back(token);
            if self.current.len() > self.window {
                self.current.pop_front();
            }
            if self.current.len() == self.window {
                return Some(self.current.iter().cloned().collect());
            }
        }
        None
    }
}

/// Build a shingle iterator over `tokens` with the given window size.
///
/// Fewer than `window` tokens yields nothing. A zero window is rejected.
pub fn shingle<T>(tokens: T, window: usize) -> Result<Shingles<T::IntoIter>>
where
    T: IntoIterator,
    T::Item: Clone,
{
    if window == 0 {
        return Err(Error::InvalidArgument(
            "shingle window must be positive".to_string(),
        ));
    }
    Ok(Shingles {
        tokens: tokens.into_iter(),
        window,
        current: VecDeque::with_capacity(window + 1),
    })
}
