//! Pick the best reference for each query column after every
//! reference has assigned its own label.

use crate::error::{LabelError, Result};
use crate::fine_tune::best_and_margin;
use crate::integrated_build::IntegratedModel;
use indicatif::ParallelProgressIterator;
use log::info;
use matrix_util::ranking::scaled_ranks;
use matrix_util::traits::ExpressionOps;
use matrix_util::utils::local_thread_pool;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

/// Result over `n` query columns and `r` kept references
#[derive(Debug, Clone)]
pub struct IntegratedClassification {
    /// Index of the winning reference among the kept ones
    pub best_reference: Vec<usize>,
    /// The label that reference assigned
    pub best_label: Vec<usize>,
    /// `n x r` score of each column against each reference's label
    pub scores: Array2<f32>,
    /// Margin of the winner over the runner-up reference (0 with one
    /// reference)
    pub delta: Vec<f32>,
}

/// Score each column against the label every reference assigned to it
///
/// # Arguments
/// * `query` - `feature x sample` query matrix
/// * `assigned` - one label vector per reference given to the builder,
///   in that order; vectors of references the builder set aside are
///   ignored
/// * `model` - the integrated model
/// * `quantile` - quantile of profile correlations, in `(0, 1]`
/// * `num_threads` - number of worker threads
pub fn classify_integrated<M>(
    query: &M,
    assigned: &[&[usize]],
    model: &IntegratedModel,
    quantile: f32,
    num_threads: usize,
) -> Result<IntegratedClassification>
where
    M: ExpressionOps,
{
    if !(quantile > 0. && quantile <= 1.) {
        return Err(LabelError::InvalidArgument(format!(
            "quantile {} should be in (0, 1]",
            quantile
        )));
    }
    if query.num_rows() != model.num_query_features() {
        return Err(LabelError::DimensionMismatch(format!(
            "query has {} rows, the model expects {}",
            query.num_rows(),
            model.num_query_features()
        )));
    }
    if assigned.len() != model.num_inputs() {
        return Err(LabelError::DimensionMismatch(format!(
            "{} label vectors for {} references",
            assigned.len(),
            model.num_inputs()
        )));
    }

    let ncols = query.num_columns();
    for x in model.references() {
        let labels = assigned[x.source];
        if labels.len() != ncols {
            return Err(LabelError::DimensionMismatch(format!(
                "reference {}: {} labels for {} columns",
                x.source,
                labels.len(),
                ncols
            )));
        }
        let nlabels = x.model.num_labels();
        if let Some(&label) = labels.iter().find(|&&l| l >= nlabels) {
            return Err(LabelError::InvalidLabel { label, nlabels });
        }
    }

    let nref = model.num_references();
    info!("integrating {} references over {} columns", nref, ncols);

    let pool = local_thread_pool(num_threads)?;
    let per_column: Vec<Vec<f32>> = pool.install(|| {
        (0..ncols)
            .into_par_iter()
            .progress_count(ncols as u64)
            .map(|j| {
                model
                    .references()
                    .iter()
                    .map(|x| {
                        let label = assigned[x.source][j];
                        let x_j = query.column_at_rows(j, &x.query_rows);
                        let q_j = scaled_ranks(&x_j);
                        x.model
                            .profiles(label)
                            .quantile_score_at(&q_j, &x.positions, quantile)
                    })
                    .collect()
            })
            .collect()
    });

    let mut out = IntegratedClassification {
        best_reference: Vec::with_capacity(ncols),
        best_label: Vec::with_capacity(ncols),
        scores: Array2::zeros((ncols, nref)),
        delta: Vec::with_capacity(ncols),
    };
    for (j, s_j) in per_column.iter().enumerate() {
        out.scores.row_mut(j).assign(&ArrayView1::from(&s_j[..]));
        let (r, delta) = best_and_margin(s_j);
        out.best_reference.push(r);
        out.best_label
            .push(assigned[model.references()[r].source][j]);
        out.delta.push(delta);
    }
    Ok(out)
}
