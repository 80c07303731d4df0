//! Classify query columns against a single reference.

use crate::error::{LabelError, Result};
use crate::fine_tune::{best_and_margin, fine_tune, FineTuneStatus};
use crate::markers::first_occurrence;
use crate::reference::ReferenceModel;
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use matrix_util::ranking::{average_ranks, scale_ranks};
use matrix_util::traits::ExpressionOps;
use matrix_util::utils::local_thread_pool;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

pub const DEFAULT_QUANTILE: f32 = 0.8;
pub const DEFAULT_FINE_TUNE_THRESHOLD: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct ClassifyArgs {
    /// Quantile of per-profile correlations taken as a label's score,
    /// in `(0, 1]`
    pub quantile: f32,
    pub fine_tune: bool,
    /// Labels within this distance of the best are fine-tuned
    pub fine_tune_threshold: f32,
    /// Round limit of fine-tuning (default: number of labels)
    pub max_fine_tune_rounds: Option<usize>,
    pub num_threads: usize,
}

impl Default for ClassifyArgs {
    fn default() -> Self {
        Self {
            quantile: DEFAULT_QUANTILE,
            fine_tune: true,
            fine_tune_threshold: DEFAULT_FINE_TUNE_THRESHOLD,
            max_fine_tune_rounds: None,
            num_threads: 1,
        }
    }
}

impl ClassifyArgs {
    pub fn validate(&self) -> Result<()> {
        if !(self.quantile > 0. && self.quantile <= 1.) {
            return Err(LabelError::InvalidArgument(format!(
                "quantile {} should be in (0, 1]",
                self.quantile
            )));
        }
        if self.fine_tune_threshold.is_nan() || self.fine_tune_threshold < 0. {
            return Err(LabelError::InvalidArgument(format!(
                "fine-tuning threshold {} should be non-negative",
                self.fine_tune_threshold
            )));
        }
        Ok(())
    }
}

/// Result of [`classify`] over `n` query columns and `k` labels
#[derive(Debug, Clone)]
pub struct SingleClassification {
    /// Assigned label of each column
    pub best: Vec<usize>,
    /// `n x k` first-round scores, never overwritten by fine-tuning
    pub scores: Array2<f32>,
    /// Margin between the best and the runner-up label of the final
    /// round
    pub delta: Vec<f32>,
    pub fine_tune: Vec<FineTuneStatus>,
    /// Fine-tuning rounds run for each column
    pub rounds: Vec<usize>,
}

impl SingleClassification {
    pub fn num_columns(&self) -> usize {
        self.best.len()
    }

    /// Columns whose fine-tuning stopped at the round limit
    pub fn diagnostics(&self) -> Vec<LabelError> {
        self.fine_tune
            .iter()
            .enumerate()
            .filter(|(_, &s)| s == FineTuneStatus::CapReached)
            .map(|(column, _)| LabelError::ConvergenceGuardTripped {
                column,
                rounds: self.rounds[column],
            })
            .collect()
    }
}

struct ColumnCall {
    best: usize,
    scores: Vec<f32>,
    delta: f32,
    status: FineTuneStatus,
    rounds: usize,
}

fn classify_column(
    query: &[f32],
    model: &ReferenceModel,
    args: &ClassifyArgs,
    max_rounds: usize,
) -> ColumnCall {
    let ranks = average_ranks(query);
    let scaled = scale_ranks(&ranks);
    let scores: Vec<f32> = (0..model.num_labels())
        .map(|l| model.profiles(l).quantile_score(&scaled, args.quantile))
        .collect();

    let (best, delta) = best_and_margin(&scores);
    if !args.fine_tune || delta >= args.fine_tune_threshold || scores.len() < 2 {
        return ColumnCall {
            best,
            scores,
            delta,
            status: FineTuneStatus::NotNeeded,
            rounds: 0,
        };
    }

    let tuned = fine_tune(
        ArrayView1::from(&ranks[..]),
        &scores,
        model,
        args.quantile,
        args.fine_tune_threshold,
        max_rounds,
    );
    ColumnCall {
        best: tuned.best,
        scores,
        delta: tuned.delta,
        status: tuned.status,
        rounds: tuned.rounds,
    }
}

/// Assign every query column a label of the reference
///
/// # Arguments
/// * `query` - `feature x sample` query matrix
/// * `subset_rows` - the query row of each marker feature of `model`,
///   aligned with [`ReferenceModel::subset`]
/// * `model` - a built reference
/// * `args` - scoring and fine-tuning parameters
pub fn classify<M>(
    query: &M,
    subset_rows: &[usize],
    model: &ReferenceModel,
    args: &ClassifyArgs,
) -> Result<SingleClassification>
where
    M: ExpressionOps,
{
    args.validate()?;

    if subset_rows.is_empty() || subset_rows.len() != model.num_features() {
        return Err(LabelError::DimensionMismatch(format!(
            "{} query rows for {} marker features",
            subset_rows.len(),
            model.num_features()
        )));
    }
    let nrows = query.num_rows();
    if let Some(&i) = subset_rows.iter().find(|&&i| i >= nrows) {
        return Err(LabelError::DimensionMismatch(format!(
            "query row {} beyond {} rows",
            i, nrows
        )));
    }

    let ncols = query.num_columns();
    let nlabels = model.num_labels();
    let max_rounds = args.max_fine_tune_rounds.unwrap_or(nlabels);

    info!(
        "classifying {} columns over {} labels on {} features",
        ncols,
        nlabels,
        subset_rows.len()
    );

    let pool = local_thread_pool(args.num_threads)?;
    let calls: Vec<ColumnCall> = pool.install(|| {
        (0..ncols)
            .into_par_iter()
            .progress_count(ncols as u64)
            .map(|j| {
                let x_j = query.column_at_rows(j, subset_rows);
                classify_column(&x_j, model, args, max_rounds)
            })
            .collect()
    });

    let mut out = SingleClassification {
        best: Vec::with_capacity(ncols),
        scores: Array2::zeros((ncols, nlabels)),
        delta: Vec::with_capacity(ncols),
        fine_tune: Vec::with_capacity(ncols),
        rounds: Vec::with_capacity(ncols),
    };
    for (j, call) in calls.into_iter().enumerate() {
        out.scores
            .row_mut(j)
            .assign(&ArrayView1::from(&call.scores[..]));
        out.best.push(call.best);
        out.delta.push(call.delta);
        out.fine_tune.push(call.status);
        out.rounds.push(call.rounds);
    }

    let capped = out.diagnostics().len();
    if capped > 0 {
        warn!(
            "{} columns hit the fine-tuning round limit; their labels are less reliable",
            capped
        );
    }
    Ok(out)
}

/// Same as [`classify`], matching the marker features to query rows by
/// name
///
/// * `query_features` - name of each query row
/// * `reference_features` - name of each row of the matrix `model` was
///   built from
pub fn classify_by_name<M>(
    query: &M,
    query_features: &[Box<str>],
    model: &ReferenceModel,
    reference_features: &[Box<str>],
    args: &ClassifyArgs,
) -> Result<SingleClassification>
where
    M: ExpressionOps,
{
    if query_features.len() != query.num_rows() {
        return Err(LabelError::DimensionMismatch(format!(
            "{} feature names for {} query rows",
            query_features.len(),
            query.num_rows()
        )));
    }
    if reference_features.len() != model.num_reference_rows() {
        return Err(LabelError::DimensionMismatch(format!(
            "{} feature names for {} reference rows",
            reference_features.len(),
            model.num_reference_rows()
        )));
    }

    let query_index = first_occurrence(query_features);
    let subset_rows = model
        .subset()
        .iter()
        .map(|&g| {
            let name = &reference_features[g];
            query_index
                .get(&**name)
                .copied()
                .ok_or_else(|| LabelError::MissingFeature(name.to_string()))
        })
        .collect::<Result<Vec<usize>>>()?;

    classify(query, &subset_rows, model, args)
}
