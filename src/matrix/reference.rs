//! Reference implementations of SpGEMM
//!
//! These are baselines for correctness testing and performance comparison:
//! a simple row-by-row hash-map version and a dense product through ndarray.

use ndarray::LinalgScalar;
use num_traits::Num;
use std::collections::HashMap;
use std::ops::AddAssign;

use crate::error::{Error, Result};
use crate::matrix::CsrMatrix;

/// Performs sparse matrix multiplication using a simple algorithm as a reference implementation
///
/// This implementation uses a simple row-by-row approach with a hashmap accumulator.
/// It's not optimized for performance but provides a correct reference result.
/// Both operands must satisfy every CSR invariant.
pub fn reference_spgemm<T>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> CsrMatrix<T>
where
    T: Copy + Num + AddAssign,
{
    assert_eq!(
        a.n_cols, b.n_rows,
        "Matrix dimensions must be compatible for multiplication"
    );

    let n_rows = a.n_rows;
    let n_cols = b.n_cols;

    let mut row_ptr = Vec::with_capacity(n_rows + 1);
    let mut col_idx = Vec::new();
    let mut values = Vec::new();

    row_ptr.push(0);

    for i in 0..n_rows {
        let mut accum: HashMap<usize, T> = HashMap::new();

        for (k, &a_val) in a.row_iter(i) {
            for (j, &b_val) in b.row_iter(k) {
                *accum.entry(j).or_insert(T::zero()) += a_val * b_val;
            }
        }

        let mut row_entries: Vec<_> = accum.into_iter().collect();
        row_entries.sort_by_key(|&(col, _)| col);

        for (j, val) in row_entries {
            if !val.is_zero() {
                col_idx.push(j);
                values.push(val);
            }
        }

        row_ptr.push(col_idx.len());
    }

    CsrMatrix::new(n_rows, n_cols, row_ptr, col_idx, values)
}

/// Multiplies the dense expansions of both operands and converts the product back to CSR
///
/// Memory use is `O(a.n_rows * b.n_cols)`, so this is only meant for tests.
pub fn dense_reference_spgemm<T>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> Result<CsrMatrix<T>>
where
    T: LinalgScalar + Num,
{
    if a.n_cols != b.n_rows {
        return Err(Error::DimensionMismatch {
            a_cols: a.n_cols,
            b_rows: b.n_rows,
        });
    }

    let product = a.to_dense()?.dot(&b.to_dense()?);
    Ok(CsrMatrix::from_dense(&product))
}
