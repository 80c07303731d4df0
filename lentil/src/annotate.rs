//! End-to-end label transfer by feature and label names.

use crate::classify::{classify_by_name, ClassifyArgs, SingleClassification};
use crate::error::{LabelError, Result};
use crate::integrated_build::{IntegratedBuilder, IntegratedModel};
use crate::integrated_classify::{classify_integrated, IntegratedClassification};
use crate::marker_selection::{classic_markers, NamedReference};
use crate::markers::NamedMarkers;
use crate::names::factorize;
use crate::reference::{BuildArgs, ReferenceBuilder, ReferenceModel};
use fnv::FnvHashSet as HashSet;
use log::{info, warn};
use matrix_util::column_access::RowSubsetView;
use matrix_util::traits::ExpressionOps;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AnnotateArgs {
    /// Markers per label pair (default: depends on the number of labels)
    pub num_markers: Option<usize>,
    pub approximate: bool,
    /// Leave out features with a non-finite value in either matrix
    pub drop_non_finite: bool,
    /// Scoring parameters; its thread count is used throughout
    pub classify: ClassifyArgs,
}

impl Default for AnnotateArgs {
    fn default() -> Self {
        Self {
            num_markers: None,
            approximate: false,
            drop_non_finite: true,
            classify: ClassifyArgs::default(),
        }
    }
}

/// Labels transferred from one reference
pub struct SingleAnnotation {
    /// Label names; ids in `result` index into these
    pub labels: Vec<Box<str>>,
    /// Reference features the model was built on
    pub features: Vec<Box<str>>,
    pub markers: NamedMarkers,
    pub model: Arc<ReferenceModel>,
    pub result: SingleClassification,
}

impl SingleAnnotation {
    pub fn best_names(&self) -> Vec<Box<str>> {
        self.result
            .best
            .iter()
            .map(|&l| self.labels[l].clone())
            .collect()
    }
}

/// Transfer labels of one named reference onto a query
///
/// # Arguments
/// * `query` - `feature x sample` query matrix
/// * `query_features` - query row names
/// * `reference` - named reference; `labels` holds one name per column
/// * `args` - marker, build and scoring parameters
pub fn annotate_single<Q, R>(
    query: &Q,
    query_features: &[Box<str>],
    reference: &NamedReference<'_, R>,
    args: &AnnotateArgs,
) -> Result<SingleAnnotation>
where
    Q: ExpressionOps,
    R: ExpressionOps + ?Sized,
{
    if query_features.len() != query.num_rows() {
        return Err(LabelError::DimensionMismatch(format!(
            "{} feature names for {} query rows",
            query_features.len(),
            query.num_rows()
        )));
    }
    if reference.features.len() != reference.mat.num_rows() {
        return Err(LabelError::DimensionMismatch(format!(
            "{} feature names for {} reference rows",
            reference.features.len(),
            reference.mat.num_rows()
        )));
    }
    args.classify.validate()?;
    let num_threads = args.classify.num_threads;

    let (labels, ids) = factorize(reference.labels);

    let usable: HashSet<&str> = query_features
        .iter()
        .enumerate()
        .filter(|&(i, _)| !args.drop_non_finite || query.row_is_finite(i))
        .map(|(_, x)| &**x)
        .collect();

    let rows: Vec<usize> = reference
        .features
        .iter()
        .enumerate()
        .filter(|&(g, x)| {
            usable.contains(&**x)
                && (!args.drop_non_finite || reference.mat.row_is_finite(g))
        })
        .map(|(g, _)| g)
        .collect();

    if rows.is_empty() {
        return Err(LabelError::FeatureUniverseMismatch { reference: 0 });
    }

    let features: Vec<Box<str>> = rows.iter().map(|&g| reference.features[g].clone()).collect();
    info!(
        "{} of {} reference features are usable, {} labels",
        rows.len(),
        reference.features.len(),
        labels.len()
    );

    let view = RowSubsetView::new(reference.mat, &rows);
    let markers = classic_markers(&view, &ids, labels.len(), args.num_markers, num_threads)?;

    let model = ReferenceBuilder::new(BuildArgs {
        approximate: args.approximate,
        num_threads,
        restrict_to: None,
    })
    .build(&view, &ids, &markers)?;

    let result = classify_by_name(query, query_features, &model, &features, &args.classify)?;

    Ok(SingleAnnotation {
        markers: markers.to_named(&labels, &features)?,
        labels,
        features,
        model,
        result,
    })
}

/// Labels transferred from several references and the reference that
/// fits each column best
pub struct IntegratedAnnotation {
    /// One entry per input reference; `None` when it shares no usable
    /// feature with the query
    pub per_reference: Vec<Option<SingleAnnotation>>,
    pub model: IntegratedModel,
    pub result: IntegratedClassification,
}

impl IntegratedAnnotation {
    fn label_names(&self, source: usize) -> &[Box<str>] {
        self.per_reference[source]
            .as_ref()
            .map(|x| &x.labels[..])
            .unwrap_or(&[])
    }

    /// Label name chosen for each column
    pub fn best_names(&self) -> Vec<Box<str>> {
        self.best_sources()
            .into_iter()
            .zip(self.result.best_label.iter())
            .map(|(source, &l)| self.label_names(source)[l].clone())
            .collect()
    }

    /// Input position of the winning reference of each column
    pub fn best_sources(&self) -> Vec<usize> {
        self.result
            .best_reference
            .iter()
            .map(|&r| self.model.references()[r].source())
            .collect()
    }
}

/// Annotate with every reference, then combine them. References
/// sharing no usable feature with the query are reported in the
/// model's diagnostics and left out.
///
/// * `query` - `feature x sample` query matrix
/// * `query_features` - query row names
/// * `references` - named references with label names per column
pub fn annotate_integrated<Q, R>(
    query: &Q,
    query_features: &[Box<str>],
    references: &[NamedReference<'_, R>],
    args: &AnnotateArgs,
) -> Result<IntegratedAnnotation>
where
    Q: ExpressionOps,
    R: ExpressionOps + ?Sized,
{
    if references.is_empty() {
        return Err(LabelError::InvalidArgument("no references to annotate with".into()));
    }

    let mut builder = IntegratedBuilder::new(query_features);
    let mut per_reference = Vec::with_capacity(references.len());

    for (r, x) in references.iter().enumerate() {
        info!("annotating with reference {}", r);
        match annotate_single(query, query_features, x, args) {
            Ok(single) => {
                builder.add(single.model.clone(), &single.features)?;
                per_reference.push(Some(single));
            }
            Err(LabelError::FeatureUniverseMismatch { .. }) => {
                warn!("reference {} shares no usable feature with the query", r);
                builder.skip();
                per_reference.push(None);
            }
            Err(e) => return Err(e),
        }
    }
    let model = builder.finish()?;

    let assigned: Vec<&[usize]> = per_reference
        .iter()
        .map(|x| x.as_ref().map(|s| &s.result.best[..]).unwrap_or(&[]))
        .collect();
    let result = classify_integrated(
        query,
        &assigned,
        &model,
        args.classify.quantile,
        args.classify.num_threads,
    )?;

    Ok(IntegratedAnnotation {
        per_reference,
        model,
        result,
    })
}
