use crate::traits::ExpressionOps;
use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;
use ndarray::Array2;

impl ExpressionOps for DMatrix<f32> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_columns(&self) -> usize {
        self.ncols()
    }

    fn column_at_rows(&self, col: usize, rows: &[usize]) -> Vec<f32> {
        let x_j = self.column(col);
        rows.iter().map(|&i| x_j[i]).collect()
    }

    fn row_dense(&self, row: usize) -> Vec<f32> {
        self.row(row).iter().copied().collect()
    }
}

impl ExpressionOps for Array2<f32> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_columns(&self) -> usize {
        self.ncols()
    }

    fn column_at_rows(&self, col: usize, rows: &[usize]) -> Vec<f32> {
        let x_j = self.column(col);
        rows.iter().map(|&i| x_j[i]).collect()
    }

    fn row_dense(&self, row: usize) -> Vec<f32> {
        self.row(row).to_vec()
    }
}

/// Sparse columns are stored with sorted row indices, so each look-up
/// is a binary search; missing entries are zero.
impl ExpressionOps for CscMatrix<f32> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_columns(&self) -> usize {
        self.ncols()
    }

    fn column_at_rows(&self, col: usize, rows: &[usize]) -> Vec<f32> {
        let x_j = self.col(col);
        let (idx, val) = (x_j.row_indices(), x_j.values());
        rows.iter()
            .map(|i| match idx.binary_search(i) {
                Ok(k) => val[k],
                Err(_) => 0.0,
            })
            .collect()
    }

    fn row_dense(&self, row: usize) -> Vec<f32> {
        (0..self.ncols())
            .map(|j| {
                let x_j = self.col(j);
                match x_j.row_indices().binary_search(&row) {
                    Ok(k) => x_j.values()[k],
                    Err(_) => 0.0,
                }
            })
            .collect()
    }

    fn row_is_finite(&self, row: usize) -> bool {
        (0..self.ncols()).all(|j| {
            let x_j = self.col(j);
            match x_j.row_indices().binary_search(&row) {
                Ok(k) => x_j.values()[k].is_finite(),
                Err(_) => true,
            }
        })
    }
}

/// A row-restricted view of another matrix: row `i` of the view is
/// row `rows[i]` of the parent
pub struct RowSubsetView<'a, M: ?Sized> {
    parent: &'a M,
    rows: &'a [usize],
}

impl<'a, M> RowSubsetView<'a, M>
where
    M: ExpressionOps + ?Sized,
{
    /// `rows` must index rows of `parent`
    pub fn new(parent: &'a M, rows: &'a [usize]) -> Self {
        debug_assert!(rows.iter().all(|&i| i < parent.num_rows()));
        Self { parent, rows }
    }
}

impl<M> ExpressionOps for RowSubsetView<'_, M>
where
    M: ExpressionOps + ?Sized,
{
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn num_columns(&self) -> usize {
        self.parent.num_columns()
    }

    fn column_at_rows(&self, col: usize, rows: &[usize]) -> Vec<f32> {
        let parent_rows: Vec<usize> = rows.iter().map(|&i| self.rows[i]).collect();
        self.parent.column_at_rows(col, &parent_rows)
    }

    fn row_dense(&self, row: usize) -> Vec<f32> {
        self.parent.row_dense(self.rows[row])
    }

    fn row_is_finite(&self, row: usize) -> bool {
        self.parent.row_is_finite(self.rows[row])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    #[test]
    fn sparse_and_dense_agree() {
        let dense = DMatrix::<f32>::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, 3.0, 0.0]);

        let mut coo = CooMatrix::<f32>::new(3, 2);
        coo.push(0, 0, 1.0);
        coo.push(1, 1, 2.0);
        coo.push(2, 0, 3.0);
        let sparse = CscMatrix::from(&coo);

        for j in 0..2 {
            assert_eq!(
                dense.column_at_rows(j, &[2, 0, 1]),
                sparse.column_at_rows(j, &[2, 0, 1])
            );
        }
        for i in 0..3 {
            assert_eq!(dense.row_dense(i), sparse.row_dense(i));
        }

        let nd = Array2::from_shape_fn((3, 2), |(i, j)| dense[(i, j)]);
        assert_eq!(nd.column_at_rows(1, &[1, 2]), vec![2.0, 0.0]);

        let view = RowSubsetView::new(&sparse, &[2, 1]);
        assert_eq!(view.num_rows(), 2);
        assert_eq!(view.row_dense(0), vec![3.0, 0.0]);
        assert_eq!(view.column_at_rows(1, &[1, 0]), vec![2.0, 0.0]);
    }
}
