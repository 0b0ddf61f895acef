//! Previous/next pairs threaded through diffing.

use serde::{Deserialize, Serialize};

/// The same conceptual entity taken from the previous and the next schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair<T> {
    /// Value from the previous (live) schema.
    pub prev: T,
    /// Value from the next (target) schema.
    pub next: T,
}

impl<T> Pair<T> {
    /// Create a new pair.
    pub fn new(prev: T, next: T) -> Self {
        Self { prev, next }
    }

    /// Borrow both sides.
    pub fn as_ref(&self) -> Pair<&T> {
        Pair::new(&self.prev, &self.next)
    }

    /// Apply `f` to both sides.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Pair<U> {
        Pair::new(f(self.prev), f(self.next))
    }

    /// Combine with another pair side by side.
    pub fn zip<U>(self, other: Pair<U>) -> Pair<(T, U)> {
        Pair::new((self.prev, other.prev), (self.next, other.next))
    }
}

impl<T> Pair<Option<T>> {
    /// Both sides when both are present.
    pub fn transpose(self) -> Option<Pair<T>> {
        match (self.prev, self.next) {
            (Some(prev), Some(next)) => Some(Pair::new(prev, next)),
            _ => None,
        }
    }
}

impl<T: PartialEq> Pair<T> {
    /// Whether the two sides differ.
    pub fn differs(&self) -> bool {
        self.prev != self.next
    }
}
