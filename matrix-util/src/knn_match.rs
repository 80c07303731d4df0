use instant_distance::{Builder, HnswMap, Search};
use ndarray::{Array1, ArrayView1};

/// Candidates kept during a graph walk
pub const DEFAULT_EF_SEARCH: usize = 100;
const DEFAULT_SEED: u64 = 42;

/// An HNSW index (HnswMap wrapper) over unit-norm, centred rank
/// vectors. For such vectors `d^2 = 2 - 2 r`, so the nearest columns
/// are the most correlated ones.
///
/// The points live in the graph only; callers keep their own copy of
/// the vectors if they need exact dot products.
pub struct CorrelationIndex {
    dict: HnswMap<VecPoint, usize>,
    len: usize,
    ef_search: usize,
}

impl CorrelationIndex {
    /// Index the columns; the value of each entry is its position in
    /// `data`
    ///
    /// * `data` - scaled rank vectors, all of the same length
    ///
    pub fn from_column_views(data: &[ArrayView1<f32>]) -> Self {
        let data_vec: Vec<VecPoint> = data.iter().map(|x| x.to_vp()).collect();
        let len = data_vec.len();
        let names: Vec<usize> = (0..len).collect();

        let dict = Builder::default()
            .ef_search(DEFAULT_EF_SEARCH)
            .seed(DEFAULT_SEED)
            .build(data_vec, names);

        Self {
            dict,
            len,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A search never returns more than this many columns
    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    /// Positions of (approximately) the `knn` nearest columns, closest
    /// first. Returns fewer than `knn` when `knn` exceeds
    /// [`Self::ef_search`] or the graph walk ends early.
    ///
    /// * `query` - scaled rank vector
    /// * `knn` - the number of nearest neighbours to return
    ///
    pub fn search_nearest(&self, query: &Array1<f32>, knn: usize) -> Vec<usize> {
        let query = query.view().to_vp();
        let mut search = Search::default();
        self.dict
            .search(&query, &mut search)
            .take(knn.min(self.len))
            .map(|item| *item.value)
            .collect()
    }
}

/// A dense point for the HNSW graph
#[derive(Clone, Debug)]
pub struct VecPoint {
    pub data: Vec<f32>,
}

pub trait MakeVecPoint {
    fn to_vp(&self) -> VecPoint;
}

impl MakeVecPoint for ArrayView1<'_, f32> {
    fn to_vp(&self) -> VecPoint {
        VecPoint {
            data: self.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
static DISTANCE_CALLS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

impl instant_distance::Point for VecPoint {
    fn distance(&self, other: &Self) -> f32 {
        #[cfg(test)]
        DISTANCE_CALLS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }
}
