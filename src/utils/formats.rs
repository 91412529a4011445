//! Conversions between CsrMatrix and the sprs crate

use num_traits::Num;
use sprs::CsMat;

use crate::error::Result;
use crate::matrix::CsrMatrix;

/// Converts our CSR matrix to a sprs CsMat in CSR storage
///
/// sprs requires sorted column indices within each row, so rows are sorted on
/// the way out; the matrix must otherwise satisfy every CSR invariant.
pub fn to_sprs_csr<T>(matrix: &CsrMatrix<T>) -> Result<CsMat<T>>
where
    T: Copy + Num + Default,
{
    matrix.validate("input")?;

    let mut row_ptr = Vec::with_capacity(matrix.n_rows + 1);
    let mut col_idx = Vec::with_capacity(matrix.nnz());
    let mut values = Vec::with_capacity(matrix.nnz());

    row_ptr.push(0);
    for i in 0..matrix.n_rows {
        let mut row: Vec<(usize, T)> = matrix.row_iter(i).map(|(col, &val)| (col, val)).collect();
        row.sort_unstable_by_key(|&(col, _)| col);

        for (col, val) in row {
            col_idx.push(col);
            values.push(val);
        }
        row_ptr.push(col_idx.len());
    }

    Ok(CsMat::new((matrix.n_rows, matrix.n_cols), row_ptr, col_idx, values))
}

/// Converts a sprs CsMat (CSR or CSC storage) to our CsrMatrix
pub fn from_sprs_csr<T>(matrix: CsMat<T>) -> CsrMatrix<T>
where
    T: Copy + Num + Default,
{
    // Ensure matrix is in CSR format
    let matrix = if matrix.is_csr() {
        matrix
    } else {
        matrix.to_csr()
    };

    let shape = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();

    CsrMatrix::new(shape.0, shape.1, indptr, indices, data)
}
