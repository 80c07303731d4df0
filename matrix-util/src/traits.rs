use crate::common_io::Delimiter;

/// Read-only access to a `feature x sample` matrix, either dense or
/// sparse. Nothing here mutates the underlying storage.
pub trait ExpressionOps: Sync {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    /// Dense values of column `col` at the given `rows`, in the order
    /// of `rows`
    fn column_at_rows(&self, col: usize, rows: &[usize]) -> Vec<f32>;

    /// Dense values of the whole row `row`
    fn row_dense(&self, row: usize) -> Vec<f32>;

    /// Whether every entry of the row is finite
    fn row_is_finite(&self, row: usize) -> bool {
        self.row_dense(row).iter().all(|x| x.is_finite())
    }
}

/// A matrix with row and column names
pub struct MatWithNames<M> {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub mat: M,
}

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    /// Read a delimited file where the first line holds column names
    /// and the first field of each line holds the row name
    fn read_named_delim(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<MatWithNames<Self::Mat>>;

    fn from_named_tsv(tsv_file: &str) -> anyhow::Result<MatWithNames<Self::Mat>> {
        Self::read_named_delim(tsv_file, "\t")
    }

    fn write_named_delim(
        &self,
        file: &str,
        delim: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
    ) -> anyhow::Result<()>;

    fn to_named_tsv(
        &self,
        tsv_file: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
    ) -> anyhow::Result<()> {
        self.write_named_delim(tsv_file, "\t", row_names, column_names)
    }
}
