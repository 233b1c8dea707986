//! Iterator adapters used when building node-sets.

use crate::reiterable::{Reiterable, Replay};
use std::collections::HashSet;
use std::hash::Hash;

/// Yields each item the first time it is seen, preserving first-seen order.
pub struct Distinct<I: Iterator> {
    inner: I,
    seen: HashSet<I::Item>,
}

impl<I> Iterator for Distinct<I>
where
    I: Iterator,
    I::Item: Eq + Hash + Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.inner.by_ref() {
            if self.seen.insert(item.clone()) {
                return Some(item);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

pub fn distinct<I>(iter: I) -> Distinct<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Eq + Hash + Clone,
{
    Distinct {
        inner: iter.into_iter(),
        seen: HashSet::new(),
    }
}

/// Splits one source into `n` independent consumers sharing a single pass.
pub fn tee<I>(iter: I, n: usize) -> Vec<Replay<I::IntoIter>>
where
    I: IntoIterator,
    I::Item: Clone,
{
    let shared = Reiterable::new(iter.into_iter());
    (0..n).map(|_| shared.iter()).collect()
}

pub trait IteratorExt: Iterator + Sized {
    fn distinct(self) -> Distinct<Self>
    where
        Self::Item: Eq + Hash + Clone,
    {
        distinct(self)
    }

    fn reiterable(self) -> Reiterable<Self>
    where
        Self::Item: Clone,
    {
        Reiterable::new(self)
    }

    fn tee(self, n: usize) -> Vec<Replay<Self>>
    where
        Self::Item: Clone,
    {
        tee(self, n)
    }
}

impl<I: Iterator> IteratorExt for I {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_distinct_preserves_first_seen_order() {
        let out: Vec<_> = vec![3, 1, 3, 2, 1, 4].into_iter().distinct().collect();
        assert_eq!(out, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_distinct_never_repeats() {
        let words = "a b a c b a".split(' ');
        let out: Vec<_> = distinct(words).collect();
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tee_runs_source_once() {
        let pulls = Cell::new(0);
        let mut consumers = (0..5).inspect(|_| pulls.set(pulls.get() + 1)).tee(3);
        let third = consumers.pop().map(|c| c.sum::<i32>());
        let second = consumers.pop().map(|c| c.count());
        let first = consumers.pop().map(|c| c.max());
        assert_eq!(third, Some(10));
        assert_eq!(second, Some(5));
        assert_eq!(first, Some(Some(4)));
        assert_eq!(pulls.get(), 5);
    }

    #[test]
    fn test_map_filter_chain_stays_lazy() {
        let pulls = Cell::new(0);
        let evens = (0..100)
            .inspect(|_| pulls.set(pulls.get() + 1))
            .filter(|n| n % 2 == 0)
            .map(|n| n * 10)
            .reiterable();
        assert_eq!(evens.get(1), Some(20));
        assert_eq!(pulls.get(), 3);
    }
}
