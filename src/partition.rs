//! Contiguous row partitioning across workers
//!
//! Rows are split into equal counts; the remainder goes one extra row each to
//! the lowest ranks. A worker may receive an empty range when there are more
//! workers than rows.

use std::ops::Range;

use crate::error::{Error, Result};

/// Half-open row range `[start, end)` assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    /// First row owned by the worker
    pub start: usize,
    /// One past the last row owned by the worker
    pub end: usize,
}

impl RowRange {
    /// Number of rows in the range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the worker owns no rows
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<RowRange> for Range<usize> {
    fn from(range: RowRange) -> Self {
        range.start..range.end
    }
}

/// Computes the row range of `rank` when `total_rows` rows are split across `worker_count` workers
pub fn partition(total_rows: usize, worker_count: usize, rank: usize) -> Result<RowRange> {
    if worker_count == 0 || rank >= worker_count {
        return Err(Error::InvalidPartition { worker_count, rank });
    }

    let rows_per_worker = total_rows / worker_count;
    let remainder = total_rows % worker_count;

    let start = rank * rows_per_worker + rank.min(remainder);
    let end = start + rows_per_worker + usize::from(rank < remainder);

    Ok(RowRange { start, end })
}

/// Computes the ranges of every rank, in rank order
pub fn partition_all(total_rows: usize, worker_count: usize) -> Result<Vec<RowRange>> {
    (0..worker_count)
        .map(|rank| partition(total_rows, worker_count, rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_goes_to_lowest_ranks() {
        let ranges = partition_all(10, 4).unwrap();
        let bounds: Vec<_> = ranges.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(bounds, vec![(0, 3), (3, 6), (6, 8), (8, 10)]);
    }

    #[test]
    fn test_more_workers_than_rows() {
        let ranges = partition_all(2, 4).unwrap();
        assert_eq!(ranges[0], RowRange { start: 0, end: 1 });
        assert_eq!(ranges[1], RowRange { start: 1, end: 2 });
        assert!(ranges[2].is_empty());
        assert!(ranges[3].is_empty());
        assert_eq!(ranges[3].start, 2);
    }

    #[test]
    fn test_invalid_requests() {
        assert!(matches!(
            partition(5, 0, 0),
            Err(Error::InvalidPartition { worker_count: 0, rank: 0 })
        ));
        assert!(partition(5, 2, 2).is_err());
    }

    #[test]
    fn test_zero_rows() {
        let range = partition(0, 3, 1).unwrap();
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
    }
}
