//! Contiguous runs of line-numbered items.
//!
//! A hunk is a maximal run of items whose line numbers step by at most one.
//! [`Hunks`] indexes a file's added or removed lines into such runs so the
//! suggestion derivation can correlate deletions with additions and check
//! span containment.

use crate::group::group_by;
use crate::non_empty::NonEmpty;

/// Items that carry a 1-based line number.
pub trait HasLineNumber {
    fn line_number(&self) -> u32;
}

/// A non-empty, contiguous-by-line-number run of items.
pub type Hunk<T> = NonEmpty<T>;

/// An index of [`Hunk`]s over a sequence of line-numbered items.
///
/// Two adjacent items share a hunk when their line numbers are equal
/// (duplicates are tolerated) or differ by exactly one; any larger gap
/// starts a new hunk. Hunks keep the order the items arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunks<T> {
    hunks: Vec<Hunk<T>>,
}

impl<T: HasLineNumber> Hunks<T> {
    pub fn new(lines: Vec<T>) -> Self {
        let hunks = group_by(lines, |prev, next| {
            next.line_number() == prev.line_number()
                || next.line_number() == prev.line_number() + 1
        });

        Self { hunks }
    }

    /// The first hunk whose first element has this line number, if any.
    ///
    /// Interior lines are not retrievable; callers hold the first-line key.
    pub fn get(&self, line_number: u32) -> Option<&Hunk<T>> {
        self.hunks
            .iter()
            .find(|hunk| hunk.head().line_number() == line_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hunk<T>> + '_ {
        self.hunks.iter()
    }

    /// Whether some indexed hunk's line span wholly covers `hunk`'s span.
    /// Only the numeric spans matter, not the items themselves.
    pub fn contain(&self, hunk: &Hunk<T>) -> bool {
        self.hunks.iter().any(|x| {
            hunk.head().line_number() >= x.head().line_number()
                && hunk.last().line_number() <= x.last().line_number()
        })
    }

    /// Every indexed line number, flattened in arrival order. Used in
    /// skip-reason diagnostics.
    pub fn lines(&self) -> Vec<u32> {
        self.hunks
            .iter()
            .flat_map(|hunk| hunk.iter().map(|x| x.line_number()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}
