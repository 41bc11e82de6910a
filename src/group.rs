//! Grouping of a sequence into maximal runs of adjacent equal elements.

use crate::non_empty::NonEmpty;

/// Partition `xs` into maximal runs of adjacent equal elements, preserving
/// the order of runs and of elements within each run.
pub fn group<T: PartialEq>(xs: Vec<T>) -> Vec<NonEmpty<T>> {
    group_by(xs, |a, b| a == b)
}

/// Like [`group`], with a caller-supplied equivalence.
///
/// The predicate is evaluated between the last element of the current run
/// and the next candidate, not pairwise across the whole run. Callers must
/// supply an equivalence that is transitive within a run, or the grouping
/// becomes order-dependent.
pub fn group_by<T>(xs: Vec<T>, mut is_equal: impl FnMut(&T, &T) -> bool) -> Vec<NonEmpty<T>> {
    let mut runs: Vec<NonEmpty<T>> = Vec::new();

    for x in xs {
        let extends = runs.last().map_or(false, |run| is_equal(run.last(), &x));

        if extends {
            if let Some(run) = runs.last_mut() {
                run.push(x);
            }
        } else {
            runs.push(NonEmpty::singleton(x));
        }
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten<T>(runs: Vec<NonEmpty<T>>) -> Vec<T> {
        runs.into_iter().flat_map(NonEmpty::into_vec).collect()
    }

    #[test]
    fn test_group_adjacent_equal() {
        let runs = group(vec![1, 1, 2, 3, 3, 3, 1]);
        let shapes: Vec<Vec<i32>> = runs.into_iter().map(NonEmpty::into_vec).collect();
        assert_eq!(
            shapes,
            vec![vec![1, 1], vec![2], vec![3, 3, 3], vec![1]]
        );
    }

    #[test]
    fn test_group_empty() {
        assert!(group(Vec::<i32>::new()).is_empty());
    }

    #[test]
    fn test_group_round_trips() {
        let xs = vec![5, 5, 1, 2, 2, 9];
        assert_eq!(flatten(group(xs.clone())), xs);
    }

    #[test]
    fn test_group_by_custom_predicate() {
        // Runs of numbers with the same parity.
        let runs = group_by(vec![1, 3, 2, 4, 6, 5], |a, b| a % 2 == b % 2);
        let shapes: Vec<Vec<i32>> = runs.into_iter().map(NonEmpty::into_vec).collect();
        assert_eq!(shapes, vec![vec![1, 3], vec![2, 4, 6], vec![5]]);
    }

    #[test]
    fn test_group_by_compares_against_run_last() {
        // Predicate "differs by at most 1" is evaluated against the last
        // element only, so 1,2,3 chains into a single run.
        let runs = group_by(vec![1i32, 2, 3, 7], |a, b| (b - a).abs() <= 1);
        let shapes: Vec<Vec<i32>> = runs.into_iter().map(NonEmpty::into_vec).collect();
        assert_eq!(shapes, vec![vec![1, 2, 3], vec![7]]);
    }

    #[test]
    fn test_group_by_round_trips() {
        let xs = vec![10, 11, 11, 30, 31];
        assert_eq!(flatten(group_by(xs.clone(), |a, b| b - a <= 1)), xs);
    }
}
