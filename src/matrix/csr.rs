//! Compressed Sparse Row (CSR) matrix format implementation

use ndarray::Array2;
use num_traits::Num;
use std::fmt;

use crate::error::{Error, Result};
use crate::partition::RowRange;

/// A sparse matrix in Compressed Sparse Row (CSR) format
///
/// The CSR format stores a sparse matrix using three arrays:
/// - row_ptr: Array of size n_rows + 1 containing indices into col_idx and values arrays
/// - col_idx: Array of size nnz containing column indices of non-zero elements
/// - values: Array of size nnz containing the non-zero values
///
/// Matrices built with [`CsrMatrix::new`] or [`CsrMatrix::try_new`] satisfy all of
/// these invariants. Matrices read from text are kept exactly as read
/// ([`CsrMatrix::from_raw_parts`]) and may not; every consumer in this crate checks
/// bounds before indexing such a matrix.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrMatrix<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Row pointers (size: n_rows + 1)
    /// row_ptr[i] is the index in col_idx and values where row i starts
    /// row_ptr[n_rows] is equal to nnz
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz)
    pub col_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<T>,
}

impl<T> CsrMatrix<T> {
    /// Wraps the given arrays without checking any invariant
    pub fn from_raw_parts(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Returns the number of stored elements in the matrix
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Checks every CSR invariant, including unique columns within a row
    pub fn validate(&self, name: &'static str) -> Result<()> {
        if self.row_ptr.len() != self.n_rows + 1 {
            return Err(Error::structure(
                name,
                format!(
                    "row_ptr has {} entries, expected {}",
                    self.row_ptr.len(),
                    self.n_rows + 1
                ),
            ));
        }
        if self.col_idx.len() != self.values.len() {
            return Err(Error::structure(
                name,
                format!(
                    "{} column indices for {} values",
                    self.col_idx.len(),
                    self.values.len()
                ),
            ));
        }
        self.check_indexable(name)?;
        if self.row_ptr[self.n_rows] != self.values.len() {
            return Err(Error::structure(
                name,
                format!(
                    "last row pointer {} does not equal nnz {}",
                    self.row_ptr[self.n_rows],
                    self.values.len()
                ),
            ));
        }

        // marker[col] holds row + 1 of the last row that used col
        let mut marker = vec![0usize; self.n_cols];
        for row in 0..self.n_rows {
            for &col in &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]] {
                if marker[col] == row + 1 {
                    return Err(Error::structure(
                        name,
                        format!("duplicate column {} in row {}", col, row),
                    ));
                }
                marker[col] = row + 1;
            }
        }

        Ok(())
    }

    /// Checks the bounds the multiplication kernel relies on
    ///
    /// This is weaker than [`CsrMatrix::validate`]: surplus trailing row pointers
    /// and surplus values are tolerated, since only the first `n_rows + 1` row
    /// pointers are ever read.
    pub fn check_indexable(&self, name: &'static str) -> Result<()> {
        if self.row_ptr.len() < self.n_rows + 1 {
            return Err(Error::structure(
                name,
                format!(
                    "row pointer index out of bounds: {} rows need {} row pointers, found {}",
                    self.n_rows,
                    self.n_rows + 1,
                    self.row_ptr.len()
                ),
            ));
        }

        let used = &self.row_ptr[..=self.n_rows];
        if let Some(row) = used.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::structure(
                name,
                format!("row pointers decrease at row {}", row),
            ));
        }

        let end = used[self.n_rows];
        let stored = self.col_idx.len().min(self.values.len());
        if end > stored {
            return Err(Error::structure(
                name,
                format!(
                    "row pointers reference {} entries but only {} are stored",
                    end, stored
                ),
            ));
        }

        if let Some(&col) = self.col_idx[used[0]..end]
            .iter()
            .find(|&&col| col >= self.n_cols)
        {
            return Err(Error::structure(
                name,
                format!("column index {} out of bounds (n_cols = {})", col, self.n_cols),
            ));
        }

        Ok(())
    }

    /// Returns an iterator over the stored elements in row i
    ///
    /// Each item is a tuple (col_idx, value) representing a non-zero element
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, &T)> {
        assert!(i < self.n_rows, "Row index out of bounds");

        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];

        self.col_idx[start..end]
            .iter()
            .zip(&self.values[start..end])
            .map(|(&col, val)| (col, val))
    }
}

impl<T> CsrMatrix<T>
where
    T: Copy + Num,
{
    /// Creates a new CSR matrix with the given dimensions and data
    ///
    /// # Arguments
    ///
    /// * `n_rows` - Number of rows
    /// * `n_cols` - Number of columns
    /// * `row_ptr` - Row pointers
    /// * `col_idx` - Column indices
    /// * `values` - Non-zero values
    ///
    /// # Panics
    ///
    /// Panics if the input arrays are inconsistent:
    /// - row_ptr.len() must be n_rows + 1
    /// - col_idx.len() must equal values.len()
    /// - row_ptr[n_rows] must equal col_idx.len()
    ///
    /// Use [`CsrMatrix::try_new`] for untrusted input.
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr.len() must be n_rows + 1");
        assert_eq!(col_idx.len(), values.len(), "col_idx.len() must equal values.len()");
        assert_eq!(
            row_ptr[n_rows], col_idx.len(),
            "row_ptr[n_rows] must equal col_idx.len()"
        );

        for &col in &col_idx {
            assert!(col < n_cols, "Column index {} out of bounds (n_cols = {})", col, n_cols);
        }

        Self::from_raw_parts(n_rows, n_cols, row_ptr, col_idx, values)
    }

    /// Creates a new CSR matrix, returning an error if any invariant is violated
    pub fn try_new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        let matrix = Self::from_raw_parts(n_rows, n_cols, row_ptr, col_idx, values);
        matrix.validate("input")?;
        Ok(matrix)
    }

    /// Creates an empty matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self::from_raw_parts(n_rows, n_cols, vec![0; n_rows + 1], Vec::new(), Vec::new())
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: usize) -> Self {
        let row_ptr = (0..=n).collect();
        let col_idx = (0..n).collect();
        let values = vec![T::one(); n];

        Self::from_raw_parts(n, n, row_ptr, col_idx, values)
    }

    /// Extracts the rows in `range` as a standalone matrix
    ///
    /// Row pointers of the slice are rebased so that they start at 0. An empty
    /// range yields a matrix with zero rows and a single row pointer.
    pub fn row_slice(&self, range: RowRange) -> Result<Self> {
        let RowRange { start, end } = range;
        if start > end || end > self.n_rows {
            return Err(Error::structure(
                "A",
                format!("row range {}..{} outside 0..{}", start, end, self.n_rows),
            ));
        }
        if end >= self.row_ptr.len() {
            return Err(Error::structure(
                "A",
                format!("row pointer index out of bounds at row {}", end),
            ));
        }

        let pointers = &self.row_ptr[start..=end];
        if pointers.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::structure(
                "A",
                format!("row pointers decrease within rows {}..{}", start, end),
            ));
        }

        let lo = pointers[0];
        let hi = pointers[pointers.len() - 1];
        if hi > self.col_idx.len() || hi > self.values.len() {
            return Err(Error::structure(
                "A",
                format!("column index out of bounds at row {}", end.saturating_sub(1)),
            ));
        }

        Ok(Self::from_raw_parts(
            end - start,
            self.n_cols,
            pointers.iter().map(|&p| p - lo).collect(),
            self.col_idx[lo..hi].to_vec(),
            self.values[lo..hi].to_vec(),
        ))
    }

    /// Expands the matrix into a dense array
    ///
    /// Duplicate entries within a row are summed.
    pub fn to_dense(&self) -> Result<Array2<T>> {
        self.check_indexable("input")?;

        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for row in 0..self.n_rows {
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                let cell = &mut dense[[row, self.col_idx[idx]]];
                *cell = *cell + self.values[idx];
            }
        }

        Ok(dense)
    }

    /// Builds a CSR matrix from the non-zero cells of a dense array
    pub fn from_dense(dense: &Array2<T>) -> Self {
        let (n_rows, n_cols) = dense.dim();
        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();

        row_ptr.push(0);
        for row in dense.rows() {
            for (col, &val) in row.iter().enumerate() {
                if !val.is_zero() {
                    col_idx.push(col);
                    values.push(val);
                }
            }
            row_ptr.push(values.len());
        }

        Self::from_raw_parts(n_rows, n_cols, row_ptr, col_idx, values)
    }
}

impl<T: fmt::Debug> fmt::Debug for CsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CsrMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  nnz: {}", self.nnz())?;

        // Print a sample of the matrix content, if the structure allows it
        let max_rows_to_print = 5.min(self.n_rows);
        let printable = self.row_ptr.len() > max_rows_to_print
            && self.row_ptr[..=max_rows_to_print].windows(2).all(|w| w[0] <= w[1])
            && self.row_ptr[max_rows_to_print] <= self.col_idx.len().min(self.values.len());

        if max_rows_to_print > 0 && printable {
            writeln!(f, "  content sample:")?;

            for i in 0..max_rows_to_print {
                write!(f, "    row {}: ", i)?;
                let start = self.row_ptr[i];
                let end = self.row_ptr[i + 1];

                if start == end {
                    writeln!(f, "(empty)")?;
                } else {
                    let max_elements = 5.min(end - start);

                    for j in start..(start + max_elements) {
                        write!(f, "({}, {:?}) ", self.col_idx[j], self.values[j])?;
                    }

                    if end - start > max_elements {
                        write!(f, "... ({} more)", end - start - max_elements)?;
                    }

                    writeln!(f)?;
                }
            }

            if self.n_rows > max_rows_to_print {
                writeln!(f, "    ... ({} more rows)", self.n_rows - max_rows_to_print)?;
            }
        } else if max_rows_to_print > 0 {
            writeln!(f, "  row_ptr: {:?}", self.row_ptr)?;
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrMatrix<i32> {
        CsrMatrix::new(
            3, 3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1, 2, 3, 4, 5],
        )
    }

    #[test]
    fn test_new_matrix() {
        let matrix = sample();

        assert_eq!(matrix.n_rows, 3);
        assert_eq!(matrix.n_cols, 3);
        assert_eq!(matrix.nnz(), 5);
        assert!(matrix.validate("A").is_ok());
    }

    #[test]
    fn test_row_iter() {
        let matrix = sample();

        let row0: Vec<_> = matrix.row_iter(0).collect();
        assert_eq!(row0, vec![(0, &1), (1, &2)]);

        let row1: Vec<_> = matrix.row_iter(1).collect();
        assert_eq!(row1, vec![(1, &3)]);

        let row2: Vec<_> = matrix.row_iter(2).collect();
        assert_eq!(row2, vec![(0, &4), (2, &5)]);
    }

    #[test]
    fn test_identity() {
        let identity = CsrMatrix::<i32>::identity(3);

        assert_eq!(identity.row_ptr, vec![0, 1, 2, 3]);
        assert_eq!(identity.col_idx, vec![0, 1, 2]);
        assert_eq!(identity.values, vec![1, 1, 1]);
    }

    #[test]
    #[should_panic(expected = "row_ptr.len() must be n_rows + 1")]
    fn test_invalid_row_ptr() {
        CsrMatrix::new(
            3, 3,
            vec![0, 2, 3], // Missing last element
            vec![0, 1, 1, 0, 2],
            vec![1, 2, 3, 4, 5],
        );
    }

    #[test]
    fn test_try_new_rejects_duplicate_columns() {
        let err = CsrMatrix::try_new(1, 3, vec![0, 2], vec![1, 1], vec![1, 2]).unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        assert!(err.to_string().contains("duplicate column 1"));
    }

    #[test]
    fn test_check_indexable_tolerates_surplus_row_pointers() {
        let matrix = CsrMatrix::from_raw_parts(1, 2, vec![0, 1, 1], vec![0], vec![7]);
        assert!(matrix.check_indexable("A").is_ok());
        assert!(matrix.validate("A").is_err());
    }

    #[test]
    fn test_check_indexable_rejects_short_row_pointers() {
        let matrix = CsrMatrix::from_raw_parts(2, 2, vec![0, 1], vec![0], vec![7]);
        let err = matrix.check_indexable("A").unwrap_err();
        assert!(err.to_string().contains("row pointer index out of bounds"));
    }

    #[test]
    fn test_row_slice_rebases_pointers() {
        let matrix = sample();

        let slice = matrix.row_slice(RowRange { start: 1, end: 3 }).unwrap();
        assert_eq!(slice.n_rows, 2);
        assert_eq!(slice.n_cols, 3);
        assert_eq!(slice.row_ptr, vec![0, 1, 3]);
        assert_eq!(slice.col_idx, vec![1, 0, 2]);
        assert_eq!(slice.values, vec![3, 4, 5]);
    }

    #[test]
    fn test_empty_row_slice() {
        let slice = sample().row_slice(RowRange { start: 3, end: 3 }).unwrap();
        assert_eq!(slice.n_rows, 0);
        assert_eq!(slice.row_ptr, vec![0]);
        assert!(slice.values.is_empty());
    }

    #[test]
    fn test_dense_roundtrip_drops_zeros() {
        let dense = ndarray::arr2(&[[1, 0, 2], [0, 0, 0]]);
        let csr = CsrMatrix::from_dense(&dense);

        assert_eq!(csr.row_ptr, vec![0, 2, 2]);
        assert_eq!(csr.col_idx, vec![0, 2]);
        assert_eq!(csr.to_dense().unwrap(), dense);
    }
}
