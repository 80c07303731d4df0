use crate::traits::ExpressionOps;
use indicatif::ParallelProgressIterator;
use ndarray::{Array2, Axis};
use rayon::prelude::*;

/// Median of `xx`; the average of the two central order statistics
/// for an even number of elements. Reorders `xx`.
pub fn median(xx: &mut [f32]) -> Option<f32> {
    let n = xx.len();
    if n == 0 {
        return None;
    }
    let half = n / 2;
    let (_, upper, _) = xx.select_nth_unstable_by(half, |a, b| a.total_cmp(b));
    let upper = *upper;
    if n % 2 == 1 {
        return Some(upper);
    }
    // the lower middle is the largest of the left partition
    let lower = xx[..half]
        .iter()
        .copied()
        .max_by(|a, b| a.total_cmp(b))
        .unwrap_or(upper);
    Some((lower + upper) * 0.5)
}

/// Row-wise medians within column groups
///
/// # Arguments
/// * `mat` - `feature x sample` matrix
/// * `group_columns` - columns of each group (see
///   [`crate::utils::partition_by_membership`])
///
/// # Returns
/// `feature x group` matrix of medians; an empty group yields `NaN`,
/// so callers should reject empty groups first.
pub fn row_medians_by_group<M>(mat: &M, group_columns: &[Vec<usize>]) -> Array2<f32>
where
    M: ExpressionOps + ?Sized,
{
    let nrows = mat.num_rows();
    let ngroups = group_columns.len();
    let mut out = Array2::<f32>::zeros((nrows, ngroups));

    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .progress_count(nrows as u64)
        .for_each(|(i, mut out_i)| {
            let row = mat.row_dense(i);
            let mut buf = Vec::new();
            for (k, cols) in group_columns.iter().enumerate() {
                buf.clear();
                buf.extend(cols.iter().map(|&j| row[j]));
                out_i[k] = median(&mut buf).unwrap_or(f32::NAN);
            }
        });

    out
}
