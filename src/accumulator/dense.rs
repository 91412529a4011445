//! Dense accumulator implementation for SpGEMM
//!
//! One slot per output column, reused from row to row. Only the slots touched
//! by the current row are visited when the row is flushed.

use crate::accumulator::{Accumulator, ColumnOverflow};
use crate::matrix::Element;

/// Dense accumulator for a single row of sparse matrix multiplication
pub struct DenseAccumulator<T> {
    /// The dense accumulation array
    values: Vec<T>,

    /// Flags to track which positions in the dense array are in use
    occupied: Vec<bool>,

    /// Columns touched by the current row, in first-touch order
    col_indices: Vec<usize>,
}

impl<T> DenseAccumulator<T>
where
    T: Element,
{
    /// Create a new dense accumulator with specified column capacity
    ///
    /// # Arguments
    ///
    /// * `n_cols` - The number of columns in the output matrix (C)
    pub fn new(n_cols: usize) -> Self {
        Self {
            values: vec![T::zero(); n_cols],
            occupied: vec![false; n_cols],
            col_indices: Vec::new(),
        }
    }

    /// Width of the accumulator
    pub fn n_cols(&self) -> usize {
        self.values.len()
    }
}

impl<T> Accumulator<T> for DenseAccumulator<T>
where
    T: Element,
{
    fn reset(&mut self) {
        for &col in &self.col_indices {
            self.occupied[col] = false;
        }
        self.col_indices.clear();
    }

    fn accumulate(&mut self, col: usize, val: T) -> Result<(), ColumnOverflow> {
        if !self.occupied[col] {
            self.occupied[col] = true;
            self.col_indices.push(col);
            self.values[col] = val;
        } else {
            self.values[col] = self.values[col]
                .checked_sum(val)
                .ok_or(ColumnOverflow { col })?;
        }
        Ok(())
    }

    fn flush_row(&mut self, col_idx: &mut Vec<usize>, values: &mut Vec<T>) {
        self.col_indices.sort_unstable();

        for &col in &self.col_indices {
            let val = self.values[col];
            if !val.is_zero() {
                col_idx.push(col);
                values.push(val);
            }
        }

        self.reset();
    }
}
