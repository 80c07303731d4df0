use crate::error::{LabelError, Result};
use fnv::FnvHashMap as HashMap;

/// Marker features by name: `label_a -> label_b -> features`
pub type NamedMarkers = HashMap<Box<str>, HashMap<Box<str>, Vec<Box<str>>>>;

/// Dense `nlabels x nlabels` table of marker feature indexes.
///
/// Cell `(a, b)` holds the features that discriminate `b` over `a`,
/// in order of decreasing effect. The diagonal stays empty and the
/// table need not be symmetric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    nlabels: usize,
    table: Vec<Vec<usize>>,
}

impl MarkerSet {
    /// An empty table for `nlabels` labels
    pub fn new(nlabels: usize) -> Self {
        Self {
            nlabels,
            table: vec![vec![]; nlabels * nlabels],
        }
    }

    pub fn num_labels(&self) -> usize {
        self.nlabels
    }

    fn check(&self, a: usize, b: usize) -> Result<usize> {
        for label in [a, b] {
            if label >= self.nlabels {
                return Err(LabelError::InvalidLabel {
                    label,
                    nlabels: self.nlabels,
                });
            }
        }
        Ok(a * self.nlabels + b)
    }

    /// Markers of the pair `(a, b)`
    pub fn get(&self, a: usize, b: usize) -> Result<&[usize]> {
        let k = self.check(a, b)?;
        Ok(&self.table[k])
    }

    /// Replace the markers of the pair `(a, b)`; order is kept as given
    pub fn set(&mut self, a: usize, b: usize, markers: Vec<usize>) -> Result<()> {
        let k = self.check(a, b)?;
        if a == b && !markers.is_empty() {
            return Err(LabelError::InvalidArgument(format!(
                "markers of label {} against itself must be empty",
                a
            )));
        }
        self.table[k] = markers;
        Ok(())
    }

    /// Unchecked access for ids already known to be in range
    pub(crate) fn pair(&self, a: usize, b: usize) -> &[usize] {
        &self.table[a * self.nlabels + b]
    }

    /// Sorted, deduplicated union of every marker list
    pub fn union(&self) -> Vec<usize> {
        sorted_unique(self.table.iter().flatten().copied())
    }

    /// Sorted, deduplicated union of the markers of all ordered pairs
    /// drawn from `labels`
    pub fn union_over(&self, labels: &[usize]) -> Vec<usize> {
        sorted_unique(labels.iter().flat_map(|&a| {
            labels
                .iter()
                .flat_map(move |&b| self.pair(a, b).iter().copied())
        }))
    }

    /// Largest feature index referenced anywhere
    pub fn max_feature(&self) -> Option<usize> {
        self.table.iter().flatten().copied().max()
    }

    /// Translate every feature index with `remap`, dropping those that
    /// map to `None`. Order within each cell is kept.
    pub fn remap<F>(&self, remap: F) -> MarkerSet
    where
        F: Fn(usize) -> Option<usize>,
    {
        MarkerSet {
            nlabels: self.nlabels,
            table: self
                .table
                .iter()
                .map(|cell| cell.iter().filter_map(|&g| remap(g)).collect())
                .collect(),
        }
    }

    /// Express the table with label and feature names
    pub fn to_named(
        &self,
        label_names: &[Box<str>],
        feature_names: &[Box<str>],
    ) -> Result<NamedMarkers> {
        if label_names.len() != self.nlabels {
            return Err(LabelError::DimensionMismatch(format!(
                "{} label names for {} labels",
                label_names.len(),
                self.nlabels
            )));
        }
        if let Some(g) = self.max_feature() {
            if g >= feature_names.len() {
                return Err(LabelError::DimensionMismatch(format!(
                    "marker index {} beyond {} feature names",
                    g,
                    feature_names.len()
                )));
            }
        }

        let mut named = NamedMarkers::default();
        for (a, name_a) in label_names.iter().enumerate() {
            let inner = named.entry(name_a.clone()).or_default();
            for (b, name_b) in label_names.iter().enumerate() {
                let features = self
                    .pair(a, b)
                    .iter()
                    .map(|&g| feature_names[g].clone())
                    .collect();
                inner.insert(name_b.clone(), features);
            }
        }
        Ok(named)
    }

    /// Build a table from named markers. Labels missing from `named`
    /// leave empty cells; feature names not found in `feature_names`
    /// are skipped.
    pub fn from_named(
        named: &NamedMarkers,
        label_names: &[Box<str>],
        feature_names: &[Box<str>],
    ) -> Result<MarkerSet> {
        let feature_index: HashMap<&str, usize> = first_occurrence(feature_names);

        let mut out = MarkerSet::new(label_names.len());
        let mut nskip = 0;
        for (a, name_a) in label_names.iter().enumerate() {
            let Some(inner) = named.get(name_a) else {
                continue;
            };
            for (b, name_b) in label_names.iter().enumerate() {
                if a == b {
                    continue;
                }
                if let Some(features) = inner.get(name_b) {
                    let idx: Vec<usize> = features
                        .iter()
                        .filter_map(|f| {
                            let g = feature_index.get(f.as_ref()).copied();
                            nskip += g.is_none() as usize;
                            g
                        })
                        .collect();
                    out.set(a, b, idx)?;
                }
            }
        }
        if nskip > 0 {
            log::debug!("skipped {} marker names absent from the features", nskip);
        }
        Ok(out)
    }
}

pub(crate) fn sorted_unique<I>(iter: I) -> Vec<usize>
where
    I: Iterator<Item = usize>,
{
    let mut out: Vec<usize> = iter.collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Name -> first position
pub(crate) fn first_occurrence(names: &[Box<str>]) -> HashMap<&str, usize> {
    let mut out = HashMap::default();
    for (i, x) in names.iter().enumerate() {
        out.entry(x.as_ref()).or_insert(i);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<Box<str>> {
        xs.iter().map(|&x| Box::from(x)).collect()
    }

    #[test]
    fn set_then_get_keeps_order() -> anyhow::Result<()> {
        let mut mrk = MarkerSet::new(3);
        mrk.set(0, 2, vec![7, 1, 4])?;
        mrk.set(2, 0, vec![3])?;
        assert_eq!(mrk.get(0, 2)?, &[7, 1, 4]);
        assert_eq!(mrk.get(2, 0)?, &[3]);
        assert!(mrk.get(1, 1)?.is_empty());
        assert_eq!(mrk.union(), vec![1, 3, 4, 7]);
        assert_eq!(mrk.union_over(&[0, 1]), Vec::<usize>::new());
        assert_eq!(mrk.union_over(&[2, 0]), vec![1, 3, 4, 7]);
        Ok(())
    }

    #[test]
    fn invalid_cells() {
        let mut mrk = MarkerSet::new(2);
        assert!(matches!(
            mrk.get(0, 2),
            Err(LabelError::InvalidLabel { label: 2, nlabels: 2 })
        ));
        assert!(mrk.set(1, 1, vec![0]).is_err());
    }

    #[test]
    fn named_round_trip() -> anyhow::Result<()> {
        let labels = names(&["B", "T"]);
        let features = names(&["CD3E", "CD19", "MS4A1"]);
        let mut mrk = MarkerSet::new(2);
        mrk.set(0, 1, vec![0])?;
        mrk.set(1, 0, vec![2, 1])?;

        let named = mrk.to_named(&labels, &features)?;
        assert_eq!(named["T"]["B"], names(&["MS4A1", "CD19"]));

        let back = MarkerSet::from_named(&named, &labels, &features)?;
        assert_eq!(back, mrk);
        Ok(())
    }
}
