//! Union of two sparsity patterns with position maps.
//!
//! The merged pattern is sorted row-major. Each input receives a map giving,
//! for every one of its entries in original order, the position of that
//! entry in the merged arrays. Positions are recorded as the merged length
//! right after the entry is placed, so they are 1-based; 0 marks an entry
//! that was not placed. An entry present in only one input is mapped only
//! in that input's map.

use super::pattern::SparsityPattern;

/// Result of [`merge_sparse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPattern {
    /// Union of both inputs, sorted by `(row, col)`.
    pub pattern: SparsityPattern,
    /// 1-based merged position of each entry of the first input.
    pub one_to_merged: Vec<usize>,
    /// 1-based merged position of each entry of the second input.
    pub two_to_merged: Vec<usize>,
}

impl MergedPattern {
    /// Scatter-add values reported against the inputs into merged order.
    ///
    /// `one` and `two` are value arrays in the entry order of the first and
    /// second input respectively; `out` must have the merged length and is
    /// overwritten.
    pub fn accumulate(&self, one: &[f64], two: &[f64], out: &mut [f64]) {
        debug_assert_eq!(one.len(), self.one_to_merged.len());
        debug_assert_eq!(two.len(), self.two_to_merged.len());
        debug_assert_eq!(out.len(), self.pattern.len());
        out.iter_mut().for_each(|v| *v = 0.0);
        for (&pos, &v) in self.one_to_merged.iter().zip(one) {
            if pos > 0 {
                out[pos - 1] += v;
            }
        }
        for (&pos, &v) in self.two_to_merged.iter().zip(two) {
            if pos > 0 {
                out[pos - 1] += v;
            }
        }
    }
}

/// Merge two sparsity patterns into their sorted union.
///
/// Entries are ordered by the key `row * (max_col + 1) + col` (stable sort),
/// then merged with two cursors; equal keys are coalesced into one output
/// entry recorded in both maps. Runs in `O((n1 + n2) log(n1 + n2))`.
///
/// # Examples
/// ```
/// use mixed_core::sparsity::{merge_sparse, SparsityPattern};
///
/// let one = SparsityPattern::from_pairs([(1, 0), (0, 0)]).unwrap();
/// let two = SparsityPattern::from_pairs([(1, 1), (1, 0)]).unwrap();
/// let merged = merge_sparse(&one, &two);
///
/// assert_eq!(merged.pattern.rows(), &[0, 1, 1]);
/// assert_eq!(merged.pattern.cols(), &[0, 0, 1]);
/// assert_eq!(merged.one_to_merged, vec![2, 1]);
/// assert_eq!(merged.two_to_merged, vec![3, 2]);
/// ```
pub fn merge_sparse(one: &SparsityPattern, two: &SparsityPattern) -> MergedPattern {
    let n_one = one.len();
    let n_two = two.len();
    let stride = one.col_extent().max(two.col_extent()).max(1);

    let key = |(r, c): (usize, usize)| r * stride + c;
    let key_one: Vec<usize> = one.iter().map(key).collect();
    let key_two: Vec<usize> = two.iter().map(key).collect();

    let mut order_one: Vec<usize> = (0..n_one).collect();
    let mut order_two: Vec<usize> = (0..n_two).collect();
    order_one.sort_by_key(|&k| key_one[k]);
    order_two.sort_by_key(|&k| key_two[k]);

    let mut rows = Vec::with_capacity(n_one + n_two);
    let mut cols = Vec::with_capacity(n_one + n_two);
    let mut one_to_merged = vec![0; n_one];
    let mut two_to_merged = vec![0; n_two];

    let (mut i, mut j) = (0, 0);
    while i < n_one || j < n_two {
        let take_one = j == n_two || (i < n_one && key_one[order_one[i]] <= key_two[order_two[j]]);
        let take_two = i == n_one || (j < n_two && key_two[order_two[j]] <= key_one[order_one[i]]);

        let (r, c) = if take_one {
            let k = order_one[i];
            (one.rows()[k], one.cols()[k])
        } else {
            let k = order_two[j];
            (two.rows()[k], two.cols()[k])
        };
        rows.push(r);
        cols.push(c);
        let position = rows.len();

        if take_one {
            one_to_merged[order_one[i]] = position;
            i += 1;
        }
        if take_two {
            let k = order_two[j];
            debug_assert_eq!((two.rows()[k], two.cols()[k]), (r, c));
            two_to_merged[k] = position;
            j += 1;
        }
    }

    MergedPattern {
        pattern: SparsityPattern::from_unique(rows, cols),
        one_to_merged,
        two_to_merged,
    }
}
