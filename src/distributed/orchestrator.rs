//! Per-worker side of the distributed multiplication protocol
//!
//! Every rank runs [`run_worker`] with its own communicator. The phases are:
//!
//! 1. load and validate the operands (coordinator only)
//! 2. broadcast a proceed/abort flag
//! 3. broadcast dimensions, then sequence lengths, then sequence contents
//! 4. barrier
//! 5. multiply the local row slice of A by the full B
//! 6. agree on success: statuses gathered on the coordinator, decision broadcast
//! 7. barrier
//! 8. send partial products to the coordinator, received in ascending rank order
//! 9. barrier
//! 10. reassemble the product on the coordinator
//!
//! Every abort decision is taken on the coordinator and broadcast, so all ranks
//! leave the protocol at the same step.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::distributed::comm::{Communicator, Packet};
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, Element, KernelConfig};
use crate::multiply::local_spgemm;
use crate::partition::partition;

/// Rank that loads the inputs and assembles the product
pub const COORDINATOR: usize = 0;

/// What the coordinator holds at the end of a successful run
#[derive(Debug, Clone)]
pub struct DistributedProduct<T> {
    /// The assembled product `A × B`
    pub matrix: CsrMatrix<T>,
    /// Wall-clock time between the post-broadcast and post-compute barriers
    pub elapsed: Duration,
    /// Number of workers that took part
    pub n_workers: usize,
}

/// Runs the full protocol on one rank
///
/// `load` is only invoked on the coordinator. The coordinator returns
/// `Ok(Some(product))`, every other rank `Ok(None)`. When the run aborts, the
/// coordinator returns the root cause and the other ranks return their own
/// local error or [`Error::Aborted`].
pub fn run_worker<T, C, F>(comm: &C, load: F, config: &KernelConfig) -> Result<Option<DistributedProduct<T>>>
where
    T: Element,
    C: Communicator<T>,
    F: FnOnce() -> Result<(CsrMatrix<T>, CsrMatrix<T>)>,
{
    let rank = comm.rank();
    let size = comm.size();
    let is_coordinator = rank == COORDINATOR;

    let mut a = CsrMatrix::from_raw_parts(0, 0, Vec::new(), Vec::new(), Vec::new());
    let mut b = CsrMatrix::from_raw_parts(0, 0, Vec::new(), Vec::new(), Vec::new());
    let mut failure = None;

    if is_coordinator {
        match load().and_then(|(a, b)| check_operands(&a, &b).map(|_| (a, b))) {
            Ok((loaded_a, loaded_b)) => {
                a = loaded_a;
                b = loaded_b;
            }
            Err(err) => failure = Some(err),
        }
    }

    if !comm.broadcast_flag(COORDINATOR, failure.is_none())? {
        debug!(rank, "aborting before broadcast");
        return Err(failure.unwrap_or(Error::Aborted));
    }

    broadcast_operands(comm, &mut a, &mut b)?;
    comm.barrier()?;

    let start = Instant::now();
    let local = compute_local(rank, size, &a, &b, config);
    let local = agree(comm, local)?;
    comm.barrier()?;
    let elapsed = start.elapsed();

    if !is_coordinator {
        send_partial(comm, &local)?;
        comm.barrier()?;
        return Ok(None);
    }

    let partials = (1..size)
        .map(|source| recv_partial(comm, source, b.n_cols))
        .collect::<Result<Vec<_>>>();
    // A receive error outranks whatever the barrier reports afterwards
    let barrier = comm.barrier();
    let partials = partials?;
    barrier?;

    let matrix = reassemble(local, partials, a.n_rows, b.n_cols)?;
    info!(
        n_workers = size,
        rows = matrix.n_rows,
        cols = matrix.n_cols,
        nnz = matrix.nnz(),
        elapsed_secs = elapsed.as_secs_f64(),
        "distributed multiplication finished"
    );

    Ok(Some(DistributedProduct {
        matrix,
        elapsed,
        n_workers: size,
    }))
}

/// Coordinator-side validation of the loaded operands
///
/// Runs before the abort flag is broadcast, so every check that could make
/// one worker's kernel fail is decided once for all workers.
pub fn check_operands<T>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> Result<()> {
    if a.n_cols != b.n_rows {
        return Err(Error::DimensionMismatch {
            a_cols: a.n_cols,
            b_rows: b.n_rows,
        });
    }
    a.check_indexable("A")?;
    b.check_indexable("B")
}

/// Replicates both operands from the coordinator to every rank
///
/// Order: dimensions of A and B, then the lengths of values, column indices
/// and row pointers of A and B, then the contents in the same order.
fn broadcast_operands<T, C>(comm: &C, a: &mut CsrMatrix<T>, b: &mut CsrMatrix<T>) -> Result<()>
where
    T: Element,
    C: Communicator<T>,
{
    for matrix in [&mut *a, &mut *b] {
        matrix.n_rows = comm.broadcast_count(COORDINATOR, matrix.n_rows)?;
        matrix.n_cols = comm.broadcast_count(COORDINATOR, matrix.n_cols)?;
    }

    for matrix in [&mut *a, &mut *b] {
        let values_len = comm.broadcast_count(COORDINATOR, matrix.values.len())?;
        let col_idx_len = comm.broadcast_count(COORDINATOR, matrix.col_idx.len())?;
        let row_ptr_len = comm.broadcast_count(COORDINATOR, matrix.row_ptr.len())?;

        if comm.rank() != COORDINATOR {
            matrix.values.resize(values_len, T::zero());
            matrix.col_idx.resize(col_idx_len, 0);
            matrix.row_ptr.resize(row_ptr_len, 0);
        }
    }

    for matrix in [a, b] {
        comm.broadcast_values(COORDINATOR, &mut matrix.values)?;
        comm.broadcast_indices(COORDINATOR, &mut matrix.col_idx)?;
        comm.broadcast_indices(COORDINATOR, &mut matrix.row_ptr)?;
    }

    Ok(())
}

/// Multiplies this rank's row slice of `a` by `b`
fn compute_local<T>(
    rank: usize,
    size: usize,
    a: &CsrMatrix<T>,
    b: &CsrMatrix<T>,
    config: &KernelConfig,
) -> Result<CsrMatrix<T>>
where
    T: Element,
{
    let range = partition(a.n_rows, size, rank)?;
    debug!(rank, start = range.start, end = range.end, "computing local slice");

    if range.is_empty() {
        return Ok(CsrMatrix::zeros(0, b.n_cols));
    }

    let offset = range.start;
    let slice = a.row_slice(range)?;
    local_spgemm(&slice, b, config).map_err(|err| match err {
        Error::Overflow { row, col } => Error::Overflow {
            row: row + offset,
            col,
        },
        other => other,
    })
}

/// Collective agreement on the outcome of the local phase
///
/// Statuses are gathered on the coordinator in ascending rank order and the
/// combined decision is broadcast back. On abort the coordinator reports its
/// own error first, then the lowest failing rank.
fn agree<T, C>(comm: &C, local: Result<CsrMatrix<T>>) -> Result<CsrMatrix<T>>
where
    T: Clone,
    C: Communicator<T>,
{
    let rank = comm.rank();
    let status = local.as_ref().map(|_| ()).map_err(|err| err.to_string());

    if rank != COORDINATOR {
        comm.send(COORDINATOR, Packet::Status(status))?;
        return match (comm.broadcast_flag(COORDINATOR, false)?, local) {
            (true, local) => local,
            (false, Err(err)) => Err(err),
            (false, Ok(_)) => Err(Error::Aborted),
        };
    }

    let mut first_failure = None;
    for source in 1..comm.size() {
        match comm.recv(source)? {
            Packet::Status(Ok(())) => {}
            Packet::Status(Err(reason)) => {
                first_failure.get_or_insert(Error::WorkerFailed {
                    rank: source,
                    reason,
                });
            }
            other => {
                return Err(Error::Protocol {
                    rank,
                    expected: "status",
                    got: other.kind(),
                })
            }
        }
    }

    let proceed = local.is_ok() && first_failure.is_none();
    comm.broadcast_flag(COORDINATOR, proceed)?;

    match (local, first_failure) {
        (Err(err), _) => Err(err),
        (Ok(_), Some(err)) => Err(err),
        (Ok(local), None) => Ok(local),
    }
}

/// Sends a partial product to the coordinator: three lengths, then the non-empty sequences
fn send_partial<T, C>(comm: &C, partial: &CsrMatrix<T>) -> Result<()>
where
    T: Clone,
    C: Communicator<T>,
{
    comm.send_count(COORDINATOR, partial.row_ptr.len())?;
    comm.send_count(COORDINATOR, partial.col_idx.len())?;
    comm.send_count(COORDINATOR, partial.values.len())?;

    comm.send_indices(COORDINATOR, &partial.row_ptr)?;
    comm.send_indices(COORDINATOR, &partial.col_idx)?;
    comm.send_values(COORDINATOR, &partial.values)
}

/// Receives the partial product of `source`
fn recv_partial<T, C>(comm: &C, source: usize, n_cols: usize) -> Result<CsrMatrix<T>>
where
    T: Clone,
    C: Communicator<T>,
{
    let row_ptr_len = comm.recv_count(source)?;
    let col_idx_len = comm.recv_count(source)?;
    let values_len = comm.recv_count(source)?;

    if row_ptr_len == 0 {
        return Err(Error::WorkerFailed {
            rank: source,
            reason: "partial product without row pointers".to_string(),
        });
    }

    let row_ptr = comm.recv_indices(source, row_ptr_len)?;
    let col_idx = comm.recv_indices(source, col_idx_len)?;
    let values = comm.recv_values(source, values_len)?;

    debug!(source, rows = row_ptr_len - 1, nnz = values_len, "received partial product");

    Ok(CsrMatrix::from_raw_parts(row_ptr_len - 1, n_cols, row_ptr, col_idx, values))
}

/// Concatenates partial products in rank order into the global product
///
/// The first partial becomes the start of the result. For every following
/// partial, its values and column indices are appended and its row pointers,
/// minus the leading zero, are shifted by the number of entries already in
/// the result.
pub fn reassemble<T>(
    first: CsrMatrix<T>,
    rest: Vec<CsrMatrix<T>>,
    n_rows: usize,
    n_cols: usize,
) -> Result<CsrMatrix<T>> {
    let mut result = first;
    result.n_rows = n_rows;
    result.n_cols = n_cols;

    if result.row_ptr.is_empty() {
        return Err(Error::structure("C", "first partial product has no row pointers"));
    }

    for partial in rest {
        let offset = result.row_ptr[result.row_ptr.len() - 1];

        result.values.extend(partial.values);
        result.col_idx.extend(partial.col_idx);
        result
            .row_ptr
            .extend(partial.row_ptr.iter().skip(1).map(|&ptr| ptr + offset));
    }

    if result.row_ptr.len() != n_rows + 1 {
        return Err(Error::structure(
            "C",
            format!(
                "reassembled {} row pointers for {} rows",
                result.row_ptr.len(),
                n_rows
            ),
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reassemble_offsets_row_pointers() {
        // Rows 0 and 1 of [[1,2],[0,3]] computed on two ranks
        let first = CsrMatrix::from_raw_parts(1, 2, vec![0, 2], vec![0, 1], vec![1, 2]);
        let second = CsrMatrix::from_raw_parts(1, 2, vec![0, 1], vec![1], vec![3]);

        let c = reassemble(first, vec![second], 2, 2).unwrap();

        assert_eq!(c.values, vec![1, 2, 3]);
        assert_eq!(c.col_idx, vec![0, 1, 1]);
        assert_eq!(c.row_ptr, vec![0, 2, 3]);
    }

    #[test]
    fn test_reassemble_with_empty_partials() {
        let first = CsrMatrix::from_raw_parts(1, 3, vec![0, 1], vec![2], vec![5]);
        let empty = CsrMatrix::<i64>::zeros(0, 3);
        let last = CsrMatrix::from_raw_parts(2, 3, vec![0, 0, 2], vec![0, 1], vec![6, 7]);

        let c = reassemble(first, vec![empty.clone(), last, empty], 3, 3).unwrap();

        assert_eq!(c.row_ptr, vec![0, 1, 1, 3]);
        assert_eq!(c.values, vec![5, 6, 7]);
        assert!(c.validate("C").is_ok());
    }

    #[test]
    fn test_reassemble_row_count_mismatch() {
        let first = CsrMatrix::<i64>::zeros(1, 1);
        assert!(matches!(
            reassemble(first, Vec::new(), 2, 1),
            Err(Error::Structure { matrix: "C", .. })
        ));
    }

    #[test]
    fn test_check_operands() {
        let a = CsrMatrix::<i64>::identity(2);
        let b = CsrMatrix::<i64>::identity(3);
        assert!(matches!(
            check_operands(&a, &b),
            Err(Error::DimensionMismatch { a_cols: 2, b_rows: 3 })
        ));

        let broken = CsrMatrix::from_raw_parts(2, 2, vec![0, 1], vec![0], vec![1i64]);
        assert!(matches!(
            check_operands(&broken, &a),
            Err(Error::Structure { matrix: "A", .. })
        ));
    }
}
