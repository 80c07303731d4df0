//! Single-reference models: ranked marker profiles grouped by label.

use crate::error::{LabelError, Result};
use crate::markers::MarkerSet;
use crate::medians::partition_labels;
use log::info;
use matrix_util::knn_match::CorrelationIndex;
use matrix_util::ranking::{average_ranks, interpolated_quantile, scale_ranks, scaled_ranks_at};
use matrix_util::traits::ExpressionOps;
use matrix_util::utils::local_thread_pool;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BuildArgs {
    /// Use an HNSW index instead of scanning every profile
    pub approximate: bool,
    pub num_threads: usize,
    /// Only these reference rows may serve as markers, e.g. rows whose
    /// features also exist in the query
    pub restrict_to: Option<Vec<usize>>,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            approximate: true,
            num_threads: 1,
            restrict_to: None,
        }
    }
}

/// The index is only searched when a label has at least this many
/// profiles per retained candidate; smaller labels are scanned
const MIN_PROFILES_PER_CANDIDATE: usize = 8;

/// Reference profiles of one label
pub struct LabelProfiles {
    /// `subset x profile` scaled ranks within the marker subset
    scaled: Array2<f32>,
    index: Option<CorrelationIndex>,
}

impl LabelProfiles {
    fn new(ranks: Array2<f32>, approximate: bool) -> Self {
        let mut scaled = ranks;
        for mut s_j in scaled.axis_iter_mut(Axis(1)) {
            let r_j = s_j.to_vec();
            s_j.assign(&scale_ranks(&r_j));
        }

        let index = approximate.then(|| {
            let views: Vec<ArrayView1<f32>> = scaled.axis_iter(Axis(1)).collect();
            CorrelationIndex::from_column_views(&views)
        });

        Self { scaled, index }
    }

    pub fn num_profiles(&self) -> usize {
        self.scaled.ncols()
    }

    /// Number of top correlations fetched from the index for
    /// `quantile`, or `None` when a full scan is cheaper
    fn tail_search_size(&self, quantile: f32) -> Option<usize> {
        let index = self.index.as_ref()?;
        let n = self.num_profiles();
        let lo = (quantile * (n - 1) as f32).floor() as usize;
        let k = n - lo;
        let ef = index.ef_search();
        (k <= ef && n >= MIN_PROFILES_PER_CANDIDATE * ef).then_some(k)
    }

    /// Quantile of the correlations between a scaled query over the
    /// full marker subset and every profile of this label
    pub(crate) fn quantile_score(&self, query: &Array1<f32>, quantile: f32) -> f32 {
        let n = self.num_profiles();
        if let (Some(index), Some(k)) = (&self.index, self.tail_search_size(quantile)) {
            // only the upper tail above the lower order statistic matters
            let nearest = index.search_nearest(query, k);
            if nearest.len() == k {
                let mut top: Vec<f32> = nearest
                    .iter()
                    .map(|&j| self.scaled.column(j).dot(query))
                    .collect();
                top.sort_by(|a, b| a.total_cmp(b));
                return quantile_of_upper_tail(&top, n, quantile);
            }
        }
        let mut corr = self.scaled.t().dot(query).to_vec();
        interpolated_quantile(&mut corr, quantile).unwrap_or(f32::NAN)
    }

    /// Same as [`Self::quantile_score`] after restricting the profiles
    /// to `positions` of the marker subset and ranking again. `query`
    /// must already be scaled over the same positions.
    pub(crate) fn quantile_score_at(
        &self,
        query: &Array1<f32>,
        positions: &[usize],
        quantile: f32,
    ) -> f32 {
        // scaling keeps the order of the ranks, so re-ranking the scaled
        // values gives the same profile
        let mut corr: Vec<f32> = self
            .scaled
            .axis_iter(Axis(1))
            .map(|s_j| scaled_ranks_at(s_j, positions).dot(query))
            .collect();
        interpolated_quantile(&mut corr, quantile).unwrap_or(f32::NAN)
    }
}

/// Type-7 quantile of `n` values when only the ascending `top` values
/// (the largest `top.len()` of them) are known
fn quantile_of_upper_tail(top: &[f32], n: usize, quantile: f32) -> f32 {
    let pos = quantile * (n - 1) as f32;
    let offset = n - top.len();
    let lo = pos.floor() as usize;
    let hi = (pos.ceil() as usize).min(n - 1);
    let (c_lo, c_hi) = (top[lo - offset], top[hi - offset]);
    c_lo + (pos - lo as f32) * (c_hi - c_lo)
}

/// A built single reference. Immutable; share it with `Arc`.
pub struct ReferenceModel {
    subset: Vec<usize>,
    markers: MarkerSet,
    profiles: Vec<LabelProfiles>,
    num_reference_rows: usize,
    approximate: bool,
}

impl ReferenceModel {
    pub fn num_labels(&self) -> usize {
        self.profiles.len()
    }

    /// Size of the marker subset
    pub fn num_features(&self) -> usize {
        self.subset.len()
    }

    /// Reference rows of the marker subset, in increasing order
    pub fn subset(&self) -> &[usize] {
        &self.subset
    }

    /// Markers as positions within [`Self::subset`]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn num_profiles(&self, label: usize) -> Result<usize> {
        self.profiles
            .get(label)
            .map(|p| p.num_profiles())
            .ok_or(LabelError::InvalidLabel {
                label,
                nlabels: self.num_labels(),
            })
    }

    /// Number of rows of the matrix the model was built from
    pub fn num_reference_rows(&self) -> usize {
        self.num_reference_rows
    }

    pub fn is_approximate(&self) -> bool {
        self.approximate
    }

    pub(crate) fn profiles(&self, label: usize) -> &LabelProfiles {
        &self.profiles[label]
    }
}

/// Builds [`ReferenceModel`]s from a labelled reference matrix
pub struct ReferenceBuilder {
    args: BuildArgs,
}

impl ReferenceBuilder {
    pub fn new(args: BuildArgs) -> Self {
        Self { args }
    }

    /// Build a model
    ///
    /// # Arguments
    /// * `mat` - `feature x sample` reference matrix
    /// * `labels` - label id of each column, in `[0, markers.num_labels())`
    /// * `markers` - marker table over the rows of `mat`
    pub fn build<M>(
        &self,
        mat: &M,
        labels: &[usize],
        markers: &MarkerSet,
    ) -> Result<Arc<ReferenceModel>>
    where
        M: ExpressionOps,
    {
        let nrows = mat.num_rows();
        let nlabels = markers.num_labels();
        let groups = partition_labels(labels, mat.num_columns(), nlabels)?;

        if let Some(g) = markers.max_feature() {
            if g >= nrows {
                return Err(LabelError::DimensionMismatch(format!(
                    "marker feature {} beyond {} rows",
                    g, nrows
                )));
            }
        }

        let markers = match &self.args.restrict_to {
            Some(rows) => {
                let mut allowed = vec![false; nrows];
                for &i in rows {
                    if i >= nrows {
                        return Err(LabelError::DimensionMismatch(format!(
                            "restricted row {} beyond {} rows",
                            i, nrows
                        )));
                    }
                    allowed[i] = true;
                }
                markers.remap(|g| allowed[g].then_some(g))
            }
            None => markers.clone(),
        };

        let subset = markers.union();
        if subset.is_empty() {
            return Err(LabelError::DimensionMismatch(
                "no marker features to build a reference".into(),
            ));
        }

        let mut position = vec![None; nrows];
        for (p, &g) in subset.iter().enumerate() {
            position[g] = Some(p);
        }
        let markers = markers.remap(|g| position[g]);

        info!(
            "building {} reference over {} marker features, {} labels, {} profiles",
            if self.args.approximate { "an approximate" } else { "an exact" },
            subset.len(),
            nlabels,
            labels.len()
        );

        let pool = local_thread_pool(self.args.num_threads)?;
        let approximate = self.args.approximate;
        let profiles: Vec<LabelProfiles> = pool.install(|| {
            groups
                .par_iter()
                .map(|cols| {
                    let mut ranks = Array2::<f32>::zeros((subset.len(), cols.len()));
                    for (&j, mut r_j) in cols.iter().zip(ranks.axis_iter_mut(Axis(1))) {
                        let x_j = mat.column_at_rows(j, &subset);
                        r_j.assign(&Array1::from(average_ranks(&x_j)));
                    }
                    LabelProfiles::new(ranks, approximate)
                })
                .collect()
        });

        Ok(Arc::new(ReferenceModel {
            subset,
            markers,
            profiles,
            num_reference_rows: nrows,
            approximate,
        }))
    }
}
