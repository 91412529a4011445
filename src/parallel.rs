//! # Row-parallel local kernel
//!
//! Processes the rows of one worker's slice on the rayon thread pool. Each
//! rayon task owns its own accumulator; rows are concatenated in row order,
//! so the result is identical to the sequential kernel.

use rayon::prelude::*;

use crate::accumulator::create_accumulator;
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, Element, KernelConfig};
use crate::multiply::multiply_row;

/// Multiplies `a × b`, distributing the rows of `a` over rayon workers
///
/// # Examples
///
/// ```
/// use csrmul::{CsrMatrix, KernelConfig, local_spgemm_parallel};
///
/// let a = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![1, 1]);
/// let b = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![2, 2]);
///
/// let c = local_spgemm_parallel(&a, &b, &KernelConfig::default()).unwrap();
/// assert_eq!(c.values, vec![2, 2]);
/// ```
pub fn local_spgemm_parallel<T>(
    a: &CsrMatrix<T>,
    b: &CsrMatrix<T>,
    config: &KernelConfig,
) -> Result<CsrMatrix<T>>
where
    T: Element,
{
    if a.n_cols != b.n_rows {
        return Err(Error::DimensionMismatch {
            a_cols: a.n_cols,
            b_rows: b.n_rows,
        });
    }

    let n_rows = a.n_rows;
    let n_cols = b.n_cols;

    let row_results: Vec<(Vec<usize>, Vec<T>)> = (0..n_rows)
        .into_par_iter()
        .map_init(
            || create_accumulator::<T>(config.accumulator, n_cols, config.dense_threshold),
            |accumulator, i| -> Result<(Vec<usize>, Vec<T>)> {
                let mut cols = Vec::new();
                let mut vals = Vec::new();
                multiply_row(i, a, b, &mut **accumulator)?;
                accumulator.flush_row(&mut cols, &mut vals);
                Ok((cols, vals))
            },
        )
        .collect::<Result<_>>()?;

    let mut row_ptr = Vec::with_capacity(n_rows + 1);
    row_ptr.push(0);

    let mut running_nnz = 0;
    for (cols, _) in &row_results {
        running_nnz += cols.len();
        row_ptr.push(running_nnz);
    }

    let mut col_idx = Vec::with_capacity(running_nnz);
    let mut values = Vec::with_capacity(running_nnz);

    for (cols, vals) in row_results {
        col_idx.extend(cols);
        values.extend(vals);
    }

    Ok(CsrMatrix::from_raw_parts(n_rows, n_cols, row_ptr, col_idx, values))
}
