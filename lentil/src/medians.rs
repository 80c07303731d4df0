use crate::error::{LabelError, Result};
use log::info;
use matrix_util::grouped_stat::row_medians_by_group;
use matrix_util::traits::ExpressionOps;
use matrix_util::utils::{local_thread_pool, partition_by_membership};
use ndarray::Array2;

/// Check a column-aligned label vector and group the columns by label
///
/// * `labels` - one label per column
/// * `ncols` - number of columns in the matrix
/// * `nlabels` - label cardinality
///
/// Fails with `DimensionMismatch` on a length mismatch,
/// `InvalidLabel` on an out-of-range id and `EmptyReference` when a
/// label owns no column.
pub(crate) fn partition_labels(
    labels: &[usize],
    ncols: usize,
    nlabels: usize,
) -> Result<Vec<Vec<usize>>> {
    if labels.len() != ncols {
        return Err(LabelError::DimensionMismatch(format!(
            "{} labels for {} columns",
            labels.len(),
            ncols
        )));
    }

    if let Some(&label) = labels.iter().find(|&&l| l >= nlabels) {
        return Err(LabelError::InvalidLabel { label, nlabels });
    }

    let groups = partition_by_membership(labels, nlabels);

    if let Some(label) = groups.iter().position(|g| g.is_empty()) {
        return Err(LabelError::EmptyReference { label });
    }

    Ok(groups)
}

/// Per-feature, per-label medians
///
/// # Arguments
/// * `mat` - `feature x sample` matrix
/// * `labels` - label id of each column
/// * `nlabels` - label cardinality
/// * `num_threads` - number of worker threads
///
/// # Returns
/// `feature x label` matrix
pub fn grouped_medians<M>(
    mat: &M,
    labels: &[usize],
    nlabels: usize,
    num_threads: usize,
) -> Result<Array2<f32>>
where
    M: ExpressionOps,
{
    let groups = partition_labels(labels, mat.num_columns(), nlabels)?;

    info!(
        "medians of {} features over {} labels",
        mat.num_rows(),
        nlabels
    );

    let pool = local_thread_pool(num_threads)?;
    Ok(pool.install(|| row_medians_by_group(mat, &groups)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn singleton_and_pair_groups() -> anyhow::Result<()> {
        // 2 features x 3 columns; label 0 -> {0}, label 1 -> {1, 2}
        let xx = DMatrix::<f32>::from_row_slice(2, 3, &[1.5, 2.0, 5.0, -1.0, 4.0, 0.0]);
        let med = grouped_medians(&xx, &[0, 1, 1], 2, 2)?;
        assert_eq!(med[(0, 0)], 1.5);
        assert_eq!(med[(1, 0)], -1.0);
        assert_eq!(med[(0, 1)], 3.5);
        assert_eq!(med[(1, 1)], 2.0);
        Ok(())
    }

    #[test]
    fn label_errors() {
        let xx = DMatrix::<f32>::zeros(2, 3);
        assert!(matches!(
            grouped_medians(&xx, &[0, 1], 2, 1),
            Err(LabelError::DimensionMismatch(_))
        ));
        assert!(matches!(
            grouped_medians(&xx, &[0, 1, 3], 2, 1),
            Err(LabelError::InvalidLabel { label: 3, nlabels: 2 })
        ));
        assert!(matches!(
            grouped_medians(&xx, &[0, 0, 2], 3, 1),
            Err(LabelError::EmptyReference { label: 1 })
        ));
    }
}
