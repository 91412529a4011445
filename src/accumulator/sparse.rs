//! Hash-map accumulator for wide outputs
//!
//! Memory is proportional to the number of distinct columns a row touches
//! rather than to the output width.

use std::collections::HashMap;

use crate::accumulator::{Accumulator, ColumnOverflow};
use crate::matrix::Element;

/// Accumulator keyed by output column
#[derive(Default)]
pub struct SparseAccumulator<T> {
    entries: HashMap<usize, T>,
}

impl<T> SparseAccumulator<T> {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Accumulator<T> for SparseAccumulator<T>
where
    T: Element,
{
    fn reset(&mut self) {
        self.entries.clear();
    }

    fn accumulate(&mut self, col: usize, val: T) -> Result<(), ColumnOverflow> {
        let slot = self.entries.entry(col).or_insert_with(T::zero);
        *slot = slot.checked_sum(val).ok_or(ColumnOverflow { col })?;
        Ok(())
    }

    fn flush_row(&mut self, col_idx: &mut Vec<usize>, values: &mut Vec<T>) {
        let mut row: Vec<(usize, T)> = self
            .entries
            .drain()
            .filter(|(_, val)| !val.is_zero())
            .collect();
        row.sort_unstable_by_key(|&(col, _)| col);

        for (col, val) in row {
            col_idx.push(col);
            values.push(val);
        }
    }
}
