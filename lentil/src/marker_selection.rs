//! Classic pairwise marker selection from label medians.
//!
//! For an ordered pair `(a, b)` each feature's effect is
//! `median_b - median_a`; the features with the largest positive
//! effects become the markers of `b` over `a`.

use crate::error::{LabelError, Result};
use crate::markers::{MarkerSet, NamedMarkers};
use crate::names::{match_names, stable_intersect, stable_union};
use indicatif::ParallelProgressIterator;
use log::info;
use matrix_util::column_access::RowSubsetView;
use matrix_util::grouped_stat::row_medians_by_group;
use matrix_util::traits::ExpressionOps;
use matrix_util::utils::{local_thread_pool, partition_by_membership};
use ndarray::Array2;
use rayon::prelude::*;

/// Markers per pair for two labels
pub const MAX_MARKERS_PER_PAIR: usize = 500;

/// No pair ever gets fewer markers than this by default
pub const MIN_MARKERS_PER_PAIR: usize = 10;

/// Default number of markers per pair for `nlabels` labels:
/// `round(500 * (2/3)^log2(nlabels))`, floored at
/// [`MIN_MARKERS_PER_PAIR`]. More labels means fewer markers per pair.
pub fn number_of_markers(nlabels: usize) -> usize {
    if nlabels <= 1 {
        return MAX_MARKERS_PER_PAIR;
    }
    let n = (MAX_MARKERS_PER_PAIR as f64) * (2.0_f64 / 3.0).powf((nlabels as f64).log2());
    (n.round() as usize).max(MIN_MARKERS_PER_PAIR)
}

/// `feature x label` medians of one reference. Labels without any
/// column in this reference are flagged as absent.
pub struct ReferenceMedians {
    pub medians: Array2<f32>,
    pub present: Vec<bool>,
}

impl ReferenceMedians {
    /// Medians where every label must own at least one column
    pub fn from_complete<M>(
        mat: &M,
        labels: &[usize],
        nlabels: usize,
        num_threads: usize,
    ) -> Result<Self>
    where
        M: ExpressionOps,
    {
        let medians = crate::medians::grouped_medians(mat, labels, nlabels, num_threads)?;
        Ok(Self {
            medians,
            present: vec![true; nlabels],
        })
    }

    /// Medians over a shared label universe; labels absent from this
    /// reference are allowed
    pub fn from_partial<M>(
        mat: &M,
        labels: &[usize],
        nlabels: usize,
        num_threads: usize,
    ) -> Result<Self>
    where
        M: ExpressionOps + ?Sized,
    {
        if labels.len() != mat.num_columns() {
            return Err(LabelError::DimensionMismatch(format!(
                "{} labels for {} columns",
                labels.len(),
                mat.num_columns()
            )));
        }
        if let Some(&label) = labels.iter().find(|&&l| l >= nlabels) {
            return Err(LabelError::InvalidLabel { label, nlabels });
        }

        let groups = partition_by_membership(labels, nlabels);
        let present = groups.iter().map(|g| !g.is_empty()).collect();
        let pool = local_thread_pool(num_threads)?;
        let medians = pool.install(|| row_medians_by_group(mat, &groups));
        Ok(Self { medians, present })
    }

    pub fn num_features(&self) -> usize {
        self.medians.nrows()
    }

    pub fn num_labels(&self) -> usize {
        self.medians.ncols()
    }
}

/// Top `k` features by decreasing positive effect, ties broken by the
/// smaller feature index
fn top_positive(effects: &[(usize, f32)], k: usize) -> Vec<usize> {
    let mut keep: Vec<(usize, f32)> = effects
        .iter()
        .copied()
        .filter(|(_, d)| d.is_finite() && *d > 0.)
        .collect();
    keep.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    keep.truncate(k);
    keep.into_iter().map(|(g, _)| g).collect()
}

/// Choose markers for every ordered label pair
///
/// # Arguments
/// * `references` - medians over a shared feature and label universe;
///   a pair's effects are summed over the references holding both labels
/// * `num_markers` - markers per pair (default: [`number_of_markers`])
/// * `num_threads` - number of worker threads
pub fn select_markers(
    references: &[ReferenceMedians],
    num_markers: Option<usize>,
    num_threads: usize,
) -> Result<MarkerSet> {
    let Some(first) = references.first() else {
        return Err(LabelError::InvalidArgument("no reference medians".into()));
    };
    let (nfeatures, nlabels) = (first.num_features(), first.num_labels());

    for (r, x) in references.iter().enumerate() {
        if x.num_features() != nfeatures || x.num_labels() != nlabels {
            return Err(LabelError::DimensionMismatch(format!(
                "reference {} medians are {} x {}, expected {} x {}",
                r,
                x.num_features(),
                x.num_labels(),
                nfeatures,
                nlabels
            )));
        }
    }

    let k = match num_markers {
        Some(0) => {
            return Err(LabelError::InvalidArgument(
                "number of markers should be positive".into(),
            ))
        }
        Some(k) => k,
        None => number_of_markers(nlabels),
    };

    info!(
        "selecting up to {} markers for each of {} label pairs",
        k,
        nlabels * nlabels.saturating_sub(1)
    );

    let pairs: Vec<(usize, usize)> = (0..nlabels)
        .flat_map(|a| (0..nlabels).map(move |b| (a, b)))
        .filter(|(a, b)| a != b)
        .collect();

    let pool = local_thread_pool(num_threads)?;
    let chosen: Vec<Vec<usize>> = pool.install(|| {
        pairs
            .par_iter()
            .progress_count(pairs.len() as u64)
            .map(|&(a, b)| {
                let shared: Vec<&ReferenceMedians> = references
                    .iter()
                    .filter(|x| x.present[a] && x.present[b])
                    .collect();
                if shared.is_empty() {
                    return vec![];
                }
                let effects: Vec<(usize, f32)> = (0..nfeatures)
                    .map(|g| {
                        let d = shared
                            .iter()
                            .map(|x| x.medians[(g, b)] - x.medians[(g, a)])
                            .sum::<f32>();
                        (g, d)
                    })
                    .collect();
                top_positive(&effects, k)
            })
            .collect()
    });

    let mut out = MarkerSet::new(nlabels);
    for (&(a, b), markers) in pairs.iter().zip(chosen) {
        out.set(a, b, markers)?;
    }
    Ok(out)
}

/// Medians and markers of a single reference in one go
pub fn classic_markers<M>(
    mat: &M,
    labels: &[usize],
    nlabels: usize,
    num_markers: Option<usize>,
    num_threads: usize,
) -> Result<MarkerSet>
where
    M: ExpressionOps,
{
    let medians = ReferenceMedians::from_complete(mat, labels, nlabels, num_threads)?;
    select_markers(&[medians], num_markers, num_threads)
}

/// A labelled reference with feature and label names
pub struct NamedReference<'a, M: ?Sized> {
    pub mat: &'a M,
    pub features: &'a [Box<str>],
    pub labels: &'a [Box<str>],
}

/// Markers chosen across several named references
pub struct NamedMarkerSelection {
    pub markers: NamedMarkers,
    pub features: Vec<Box<str>>,
    pub labels: Vec<Box<str>>,
}

/// Markers by name over one or more references: features are the
/// names shared by every reference, labels the union of all label
/// names
pub fn select_markers_by_name<M>(
    references: &[NamedReference<'_, M>],
    num_markers: Option<usize>,
    num_threads: usize,
) -> Result<NamedMarkerSelection>
where
    M: ExpressionOps + ?Sized,
{
    for (r, x) in references.iter().enumerate() {
        if x.features.len() != x.mat.num_rows() {
            return Err(LabelError::DimensionMismatch(format!(
                "reference {}: {} feature names for {} rows",
                r,
                x.features.len(),
                x.mat.num_rows()
            )));
        }
    }

    let feature_lists: Vec<&[Box<str>]> = references.iter().map(|x| x.features).collect();
    let features = stable_intersect(&feature_lists);
    if features.is_empty() && references.iter().any(|x| !x.features.is_empty()) {
        return Err(LabelError::DimensionMismatch(
            "no common feature names across references".into(),
        ));
    }

    let label_lists: Vec<&[Box<str>]> = references.iter().map(|x| x.labels).collect();
    let labels = stable_union(&label_lists);
    let nlabels = labels.len();

    let mut medians = Vec::with_capacity(references.len());
    for x in references {
        // every common feature exists in every reference
        let rows: Vec<usize> = match_names(&features, x.features)
            .into_iter()
            .flatten()
            .collect();
        let ids: Vec<usize> = match_names(x.labels, &labels)
            .into_iter()
            .flatten()
            .collect();
        let view = RowSubsetView::new(x.mat, &rows);
        medians.push(ReferenceMedians::from_partial(
            &view,
            &ids,
            nlabels,
            num_threads,
        )?);
    }

    let markers = select_markers(&medians, num_markers, num_threads)?;
    Ok(NamedMarkerSelection {
        markers: markers.to_named(&labels, &features)?,
        features,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn marker_count_is_non_increasing_with_floor() {
        let mut prev = number_of_markers(1);
        assert_eq!(prev, MAX_MARKERS_PER_PAIR);
        for n in 2..5000 {
            let k = number_of_markers(n);
            assert!(k <= prev, "{} markers for {} labels after {}", k, n, prev);
            assert!(k >= MIN_MARKERS_PER_PAIR);
            prev = k;
        }
        assert_eq!(number_of_markers(2), 333);
        assert_eq!(number_of_markers(100_000), MIN_MARKERS_PER_PAIR);
    }

    #[test]
    fn pairwise_markers_follow_effects() -> anyhow::Result<()> {
        // 4 features x 4 columns, labels 0,0,1,1
        #[rustfmt::skip]
        let xx = DMatrix::<f32>::from_row_slice(4, 4, &[
            5.0, 5.0, 0.0, 0.0,
            0.0, 0.0, 3.0, 3.0,
            1.0, 1.0, 1.0, 1.0,
            0.0, 0.0, 9.0, 9.0,
        ]);
        let mrk = classic_markers(&xx, &[0, 0, 1, 1], 2, None, 1)?;
        assert_eq!(mrk.get(0, 1)?, &[3, 1]);
        assert_eq!(mrk.get(1, 0)?, &[0]);
        assert!(mrk.get(0, 0)?.is_empty());

        let top1 = classic_markers(&xx, &[0, 0, 1, 1], 2, Some(1), 2)?;
        assert_eq!(top1.get(0, 1)?, &[3]);
        assert!(classic_markers(&xx, &[0, 0, 1, 1], 2, Some(0), 1).is_err());
        Ok(())
    }

    #[test]
    fn named_markers_over_two_references() -> anyhow::Result<()> {
        let names = |xs: &[&str]| xs.iter().map(|&x| Box::from(x)).collect::<Vec<Box<str>>>();

        #[rustfmt::skip]
        let x1 = DMatrix::<f32>::from_row_slice(3, 2, &[
            4.0, 0.0,
            0.0, 4.0,
            1.0, 1.0,
        ]);
        let f1 = names(&["a", "b", "c"]);
        let l1 = names(&["T", "B"]);

        #[rustfmt::skip]
        let x2 = DMatrix::<f32>::from_row_slice(2, 2, &[
            1.0, 0.0,
            0.0, 6.0,
        ]);
        let f2 = names(&["b", "a"]);
        let l2 = names(&["NK", "T"]);

        let out = select_markers_by_name(
            &[
                NamedReference { mat: &x1, features: &f1, labels: &l1 },
                NamedReference { mat: &x2, features: &f2, labels: &l2 },
            ],
            None,
            1,
        )?;

        assert_eq!(out.features, names(&["a", "b"]));
        assert_eq!(out.labels, names(&["T", "B", "NK"]));
        // "a" is high in T in both references
        assert_eq!(out.markers["B"]["T"], names(&["a"]));
        assert_eq!(out.markers["NK"]["T"], names(&["a"]));
        // B and NK never meet in one reference
        assert!(out.markers["B"]["NK"].is_empty());
        Ok(())
    }
}
