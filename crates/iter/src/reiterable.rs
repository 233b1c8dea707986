//! A single-pass source wrapped in a growable replay buffer.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Shared<I: Iterator> {
    /// `None` once the source has been drained.
    source: Option<I>,
    cache: Vec<I::Item>,
}

impl<I: Iterator> Shared<I> {
    /// Pulls from the source until `index` is cached. Returns false if the
    /// source ran dry first.
    fn fill_to(&mut self, index: usize) -> bool {
        while self.cache.len() <= index {
            let Some(source) = self.source.as_mut() else {
                return false;
            };
            match source.next() {
                Some(item) => self.cache.push(item),
                None => {
                    self.source = None;
                    return false;
                }
            }
        }
        true
    }

    fn drain(&mut self) {
        if let Some(source) = self.source.take() {
            self.cache.extend(source);
        }
    }
}

/// Wraps a single-pass iterator so any number of independent consumers can
/// walk it. Every consumer replays the cached prefix and then continues
/// pulling from the one shared source, so the source runs at most once.
///
/// Clones share the same buffer.
pub struct Reiterable<I: Iterator> {
    shared: Rc<RefCell<Shared<I>>>,
}

impl<I: Iterator> Clone for Reiterable<I> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<I: Iterator> Reiterable<I>
where
    I::Item: Clone,
{
    pub fn new(source: I) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                source: Some(source),
                cache: Vec::new(),
            })),
        }
    }

    /// Builds an already-drained instance over materialized items.
    pub fn from_items(items: Vec<I::Item>) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                source: None,
                cache: items,
            })),
        }
    }

    /// Starts a new consumer at the beginning of the sequence.
    pub fn iter(&self) -> Replay<I> {
        Replay {
            shared: Rc::clone(&self.shared),
            index: 0,
        }
    }

    /// Returns the item at `index` (0-based), pulling only as far as needed.
    pub fn get(&self, index: usize) -> Option<I::Item> {
        let mut shared = self.shared.borrow_mut();
        if shared.fill_to(index) {
            Some(shared.cache[index].clone())
        } else {
            None
        }
    }

    pub fn first(&self) -> Option<I::Item> {
        self.get(0)
    }

    /// True if the sequence has no items. Pulls at most one item.
    pub fn is_empty(&self) -> bool {
        !self.shared.borrow_mut().fill_to(0)
    }

    /// True if the sequence holds more than `n` items. Pulls at most `n + 1`.
    pub fn has_more_than(&self, n: usize) -> bool {
        self.shared.borrow_mut().fill_to(n)
    }

    /// Number of items in the sequence. Drains the source.
    pub fn len(&self) -> usize {
        let mut shared = self.shared.borrow_mut();
        shared.drain();
        shared.cache.len()
    }

    /// Drains the source and returns every item.
    pub fn to_vec(&self) -> Vec<I::Item> {
        let mut shared = self.shared.borrow_mut();
        shared.drain();
        shared.cache.clone()
    }

    /// Number of items pulled from the source so far.
    pub fn materialized(&self) -> usize {
        self.shared.borrow().cache.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.shared.borrow().source.is_none()
    }
}

impl<I: Iterator> fmt::Debug for Reiterable<I>
where
    I::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("Reiterable")
            .field("cached", &shared.cache)
            .field("exhausted", &shared.source.is_none())
            .finish()
    }
}

/// One consumer's cursor into a [`Reiterable`].
pub struct Replay<I: Iterator> {
    shared: Rc<RefCell<Shared<I>>>,
    index: usize,
}

impl<I: Iterator> Iterator for Replay<I>
where
    I::Item: Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = {
            let mut shared = self.shared.borrow_mut();
            if !shared.fill_to(self.index) {
                return None;
            }
            shared.cache[self.index].clone()
        };
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let shared = self.shared.borrow();
        let cached = shared.cache.len().saturating_sub(self.index);
        match &shared.source {
            None => (cached, Some(cached)),
            Some(source) => {
                let (lower, upper) = source.size_hint();
                (
                    cached.saturating_add(lower),
                    upper.and_then(|u| u.checked_add(cached)),
                )
            }
        }
    }
}
