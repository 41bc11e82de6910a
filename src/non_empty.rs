//! A sequence guaranteed to hold at least one element.
//!
//! Runs of diff lines are never empty by construction, so code that slices
//! and regroups them works with [`NonEmpty`] instead of re-checking
//! emptiness at every use site. The invariant is enforced once, at
//! construction.

/// A non-empty sequence: a first element plus any number of following ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmpty<T> {
    head: T,
    tail: Vec<T>,
}

impl<T> NonEmpty<T> {
    /// A one-element sequence.
    pub fn singleton(head: T) -> Self {
        Self {
            head,
            tail: Vec::new(),
        }
    }

    /// Build from a known first element and the rest.
    pub fn new(head: T, tail: Vec<T>) -> Self {
        Self { head, tail }
    }

    /// `Some` only when `xs` has at least one element.
    pub fn from_vec(xs: Vec<T>) -> Option<Self> {
        let mut iter = xs.into_iter();
        let head = iter.next()?;
        Some(Self {
            head,
            tail: iter.collect(),
        })
    }

    pub fn head(&self) -> &T {
        &self.head
    }

    pub fn last(&self) -> &T {
        self.tail.last().unwrap_or(&self.head)
    }

    /// All elements but the first.
    pub fn tail(&self) -> &[T] {
        &self.tail
    }

    /// All elements but the last; empty for a singleton.
    pub fn init(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().take(self.len() - 1)
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn push(&mut self, x: T) {
        self.tail.push(x);
    }

    /// Concatenate another sequence onto this one.
    pub fn append(&mut self, other: NonEmpty<T>) {
        self.tail.push(other.head);
        self.tail.extend(other.tail);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    pub fn into_vec(self) -> Vec<T> {
        let mut xs = Vec::with_capacity(1 + self.tail.len());
        xs.push(self.head);
        xs.extend(self.tail);
        xs
    }
}
