//! Combine several built references over one query feature space.
//!
//! Each reference keeps its own marker subset. Adding a reference
//! matches its marker features to query rows by name; a reference that
//! shares nothing with the query is set aside with a diagnostic
//! instead of failing the whole model.

use crate::error::{LabelError, Result};
use crate::markers::first_occurrence;
use crate::reference::ReferenceModel;
use fnv::FnvHashMap as HashMap;
use log::{info, warn};
use std::sync::Arc;

/// One reference as seen from the query
pub struct IntegratedReference {
    /// Position of this reference in the order of [`IntegratedBuilder::add`]
    pub(crate) source: usize,
    pub(crate) model: Arc<ReferenceModel>,
    /// Query rows shared with the marker subset, increasing
    pub(crate) query_rows: Vec<usize>,
    /// Marker subset position of each of `query_rows`
    pub(crate) positions: Vec<usize>,
}

impl IntegratedReference {
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn model(&self) -> &ReferenceModel {
        &self.model
    }

    pub fn num_shared_features(&self) -> usize {
        self.query_rows.len()
    }
}

/// References ready for [`crate::integrated_classify::classify_integrated`]
pub struct IntegratedModel {
    references: Vec<IntegratedReference>,
    num_inputs: usize,
    num_query_features: usize,
    diagnostics: Vec<LabelError>,
}

impl IntegratedModel {
    /// References kept, in the order they were added
    pub fn references(&self) -> &[IntegratedReference] {
        &self.references
    }

    pub fn num_references(&self) -> usize {
        self.references.len()
    }

    /// Number of references handed to the builder, kept or not
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_query_features(&self) -> usize {
        self.num_query_features
    }

    /// Original input position of kept reference `r`
    pub fn source_index(&self, r: usize) -> Option<usize> {
        self.references.get(r).map(|x| x.source)
    }

    pub fn num_labels(&self, r: usize) -> Option<usize> {
        self.references.get(r).map(|x| x.model.num_labels())
    }

    /// Non-fatal problems met while adding references
    pub fn diagnostics(&self) -> &[LabelError] {
        &self.diagnostics
    }
}

pub struct IntegratedBuilder {
    query_index: HashMap<Box<str>, usize>,
    num_query_features: usize,
    references: Vec<IntegratedReference>,
    num_inputs: usize,
    diagnostics: Vec<LabelError>,
}

impl IntegratedBuilder {
    /// * `query_features` - name of each query row
    pub fn new(query_features: &[Box<str>]) -> Self {
        let query_index = first_occurrence(query_features)
            .into_iter()
            .map(|(k, v)| (Box::from(k), v))
            .collect();
        Self {
            query_index,
            num_query_features: query_features.len(),
            references: vec![],
            num_inputs: 0,
            diagnostics: vec![],
        }
    }

    /// Add a built reference
    ///
    /// * `model` - the reference
    /// * `reference_features` - name of each row of the matrix `model`
    ///   was built from
    ///
    /// A length mismatch between names and rows fails; no shared
    /// feature only records a `FeatureUniverseMismatch`.
    pub fn add(
        &mut self,
        model: Arc<ReferenceModel>,
        reference_features: &[Box<str>],
    ) -> Result<&mut Self> {
        if reference_features.len() != model.num_reference_rows() {
            return Err(LabelError::DimensionMismatch(format!(
                "{} feature names for {} reference rows",
                reference_features.len(),
                model.num_reference_rows()
            )));
        }

        let source = self.num_inputs;
        self.num_inputs += 1;

        let mut shared: Vec<(usize, usize)> = model
            .subset()
            .iter()
            .enumerate()
            .filter_map(|(p, &g)| {
                self.query_index
                    .get(&*reference_features[g])
                    .map(|&i| (i, p))
            })
            .collect();
        shared.sort_unstable();
        shared.dedup_by_key(|(i, _)| *i);

        if shared.is_empty() {
            warn!(
                "reference {} shares none of its {} marker features with the query",
                source,
                model.num_features()
            );
            self.diagnostics
                .push(LabelError::FeatureUniverseMismatch { reference: source });
            return Ok(self);
        }

        info!(
            "reference {}: {} of {} marker features found in the query",
            source,
            shared.len(),
            model.num_features()
        );

        let (query_rows, positions) = shared.into_iter().unzip();
        self.references.push(IntegratedReference {
            source,
            model,
            query_rows,
            positions,
        });
        Ok(self)
    }

    /// Count a reference that could not even be built on the query's
    /// features; it keeps its input position but takes no part
    pub fn skip(&mut self) -> &mut Self {
        let source = self.num_inputs;
        self.num_inputs += 1;
        self.diagnostics
            .push(LabelError::FeatureUniverseMismatch { reference: source });
        self
    }

    pub fn finish(self) -> Result<IntegratedModel> {
        if self.num_inputs == 0 {
            return Err(LabelError::InvalidArgument("no references to integrate".into()));
        }
        if self.references.is_empty() {
            // every reference was set aside; report the first
            return Err(LabelError::FeatureUniverseMismatch { reference: 0 });
        }
        Ok(IntegratedModel {
            references: self.references,
            num_inputs: self.num_inputs,
            num_query_features: self.num_query_features,
            diagnostics: self.diagnostics,
        })
    }
}
