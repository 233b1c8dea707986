//! Replayable iteration for node-sets that are inspected more than once.
//!
//! A node-set produced by an axis traversal is typically asked for its size,
//! for the node at some position and for its first node's string value, each
//! by a different consumer. [`Reiterable`] lets all of them share a single
//! pass over the underlying traversal.

pub mod combinators;
pub mod reiterable;

pub use combinators::{Distinct, IteratorExt, distinct, tee};
pub use reiterable::{Reiterable, Replay};
