//! Local sparse × sparse multiplication kernel
//!
//! Row-by-row Gustavson product: every stored `(k, a_ik)` of row `i` of A
//! scales row `k` of B into an accumulator for row `i` of C. All indices are
//! checked before they are used, so a matrix whose row pointers or column
//! indices are inconsistent yields [`Error::Structure`] instead of a panic.

use crate::accumulator::{create_accumulator, Accumulator};
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, Element, KernelConfig};
use crate::parallel::local_spgemm_parallel;

/// Multiplies `a × b` on the calling thread (or on the rayon pool when
/// `config.row_parallel` is set)
///
/// The output stores every row's entries in increasing column order and
/// never stores a zero, including sums that cancel. Integer products and
/// sums are checked: one that does not fit `T` yields [`Error::Overflow`].
///
/// # Examples
///
/// ```
/// use csrmul::{local_spgemm, CsrMatrix, KernelConfig};
///
/// let a = CsrMatrix::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1, 2, 3]);
/// let identity = CsrMatrix::identity(2);
///
/// let c = local_spgemm(&a, &identity, &KernelConfig::default()).unwrap();
/// assert_eq!(c, a);
/// ```
pub fn local_spgemm<T>(
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

    if config.row_parallel {
        return local_spgemm_parallel(a, b, config);
    }

    let mut accumulator = create_accumulator(config.accumulator, b.n_cols, config.dense_threshold);

    let mut row_ptr = Vec::with_capacity(a.n_rows + 1);
    let mut col_idx = Vec::new();
    let mut values = Vec::new();

    for i in 0..a.n_rows {
        row_ptr.push(values.len());
        multiply_row(i, a, b, accumulator.as_mut())?;
        accumulator.flush_row(&mut col_idx, &mut values);
    }
    row_ptr.push(values.len());

    Ok(CsrMatrix::from_raw_parts(a.n_rows, b.n_cols, row_ptr, col_idx, values))
}

/// Accumulates row `i` of `a × b` into `accumulator` without flushing it
pub(crate) fn multiply_row<T>(
    i: usize,
    a: &CsrMatrix<T>,
    b: &CsrMatrix<T>,
    accumulator: &mut dyn Accumulator<T>,
) -> Result<()>
where
    T: Element,
{
    accumulate_row(i, a, b, accumulator).map_err(|err| {
        accumulator.reset();
        err
    })
}

fn accumulate_row<T>(
    i: usize,
    a: &CsrMatrix<T>,
    b: &CsrMatrix<T>,
    accumulator: &mut dyn Accumulator<T>,
) -> Result<()>
where
    T: Element,
{
    if i + 1 >= a.row_ptr.len() {
        return Err(Error::structure(
            "A",
            format!("row pointer index out of bounds at row {}", i),
        ));
    }

    let (row_start, row_end) = (a.row_ptr[i], a.row_ptr[i + 1]);
    if row_start > row_end {
        return Err(Error::structure(
            "A",
            format!("row pointers decrease at row {}", i),
        ));
    }
    if row_end > a.col_idx.len() || row_end > a.values.len() {
        return Err(Error::structure(
            "A",
            format!("column index out of bounds at row {}", i),
        ));
    }

    for a_idx in row_start..row_end {
        let b_row = a.col_idx[a_idx];
        let a_val = a.values[a_idx];

        if b_row >= b.n_rows || b_row + 1 >= b.row_ptr.len() {
            return Err(Error::structure(
                "B",
                format!("accessing invalid row in B at index {}", b_row),
            ));
        }

        let (b_start, b_end) = (b.row_ptr[b_row], b.row_ptr[b_row + 1]);
        if b_start > b_end {
            return Err(Error::structure(
                "B",
                format!("row pointers decrease at row {}", b_row),
            ));
        }
        if b_end > b.col_idx.len() || b_end > b.values.len() {
            return Err(Error::structure(
                "B",
                format!("column index out of bounds in B at row {}", b_row),
            ));
        }

        for b_idx in b_start..b_end {
            let b_col = b.col_idx[b_idx];
            if b_col >= b.n_cols {
                return Err(Error::structure(
                    "B",
                    format!("column index {} out of bounds (n_cols = {})", b_col, b.n_cols),
                ));
            }

            let product = a_val
                .checked_product(b.values[b_idx])
                .ok_or(Error::Overflow { row: i, col: b_col })?;
            accumulator
                .accumulate(b_col, product)
                .map_err(|overflow| Error::Overflow {
                    row: i,
                    col: overflow.col,
                })?;
        }
    }

    Ok(())
}
