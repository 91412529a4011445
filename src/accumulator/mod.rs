//! Accumulator implementations for sparse matrix multiplication
//!
//! An accumulator collects the partial products `a[i][k] * b[k][j]` of a single
//! output row and emits them as `(column, value)` pairs in increasing column
//! order, summing contributions to the same column and dropping sums that
//! cancel to zero.

pub mod dense;
pub mod sparse;

use crate::matrix::config::AccumulatorKind;
use crate::matrix::Element;

pub use dense::DenseAccumulator;
pub use sparse::SparseAccumulator;

/// A partial sum no longer fits the element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnOverflow {
    /// Output column whose sum overflowed
    pub col: usize,
}

/// Trait for accumulators that handle intermediate products in SpGEMM
///
/// Implementations are reused across rows: [`Accumulator::flush_row`] emits
/// the current row and leaves the accumulator empty for the next one.
pub trait Accumulator<T>
where
    T: Element,
{
    /// Discard everything accumulated for the current row
    fn reset(&mut self);

    /// Accumulate a single entry (column and value)
    ///
    /// `col` must be smaller than the width the accumulator was created for.
    /// On overflow the row is left in an unspecified state and must be
    /// [`Accumulator::reset`] before reuse.
    fn accumulate(&mut self, col: usize, val: T) -> Result<(), ColumnOverflow>;

    /// Append the non-zero entries of the current row, sorted by column, then reset
    fn flush_row(&mut self, col_idx: &mut Vec<usize>, values: &mut Vec<T>);
}

/// Create the accumulator selected by `kind` for an output of `n_cols` columns
///
/// # Arguments
///
/// * `kind` - Requested strategy, `Auto` is resolved against `dense_threshold`
/// * `n_cols` - The number of columns in the output matrix
/// * `dense_threshold` - Widest output for which `Auto` picks the dense accumulator
pub fn create_accumulator<T>(
    kind: AccumulatorKind,
    n_cols: usize,
    dense_threshold: usize,
) -> Box<dyn Accumulator<T> + Send>
where
    T: Element,
{
    match kind.resolve(n_cols, dense_threshold) {
        AccumulatorKind::Sparse => Box::new(SparseAccumulator::new()),
        _ => Box::new(DenseAccumulator::new(n_cols)),
    }
}
