//! Row-partitioned distributed multiplication
//!
//! The left operand is split by rows across a fixed set of workers, every
//! worker multiplies its slice by a full copy of the right operand, and the
//! coordinator (rank 0) stitches the partial products back together.
//!
//! [`distributed_spgemm`] runs a whole in-process world on scoped threads; the
//! per-rank protocol lives in [`orchestrator::run_worker`] and can be driven
//! by any [`comm::Communicator`].

pub mod comm;
#[cfg(feature = "mpi")]
pub mod mpi;
pub mod orchestrator;

use std::thread;
use tracing::debug;

use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, DistributedConfig, Element};

pub use comm::{Communicator, Packet, ThreadComm};
#[cfg(feature = "mpi")]
pub use self::mpi::MpiComm;
pub use orchestrator::{check_operands, reassemble, run_worker, DistributedProduct, COORDINATOR};

/// Multiplies `a × b` across `config.n_workers` in-process workers
///
/// Each worker receives its own copy of both operands through the
/// coordinator's broadcast.
///
/// # Examples
///
/// ```
/// use csrmul::{distributed_spgemm, CsrMatrix, DistributedConfig};
///
/// let a = CsrMatrix::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1, 2, 3]);
/// let b = CsrMatrix::identity(2);
///
/// let product = distributed_spgemm(&a, &b, &DistributedConfig::with_workers(2)).unwrap();
/// assert_eq!(product.matrix, a);
/// ```
pub fn distributed_spgemm<T>(
    a: &CsrMatrix<T>,
    b: &CsrMatrix<T>,
    config: &DistributedConfig,
) -> Result<DistributedProduct<T>>
where
    T: Element,
{
    distributed_spgemm_with(config, || Ok((a.clone(), b.clone())))
}

/// Runs the distributed multiplication, with the operands produced by `load` on the coordinator
///
/// `load` runs on the coordinator only, after the workers have started. A
/// failing `load` aborts every worker and its error is returned.
pub fn distributed_spgemm_with<T, F>(config: &DistributedConfig, load: F) -> Result<DistributedProduct<T>>
where
    T: Element,
    F: FnOnce() -> Result<(CsrMatrix<T>, CsrMatrix<T>)>,
{
    if config.n_workers == 0 {
        return Err(Error::InvalidPartition {
            worker_count: 0,
            rank: COORDINATOR,
        });
    }

    let kernel = &config.kernel;
    let mut world = ThreadComm::<T>::world(config.n_workers).into_iter();
    let coordinator = world.next().ok_or(Error::Aborted)?;

    thread::scope(|scope| {
        let workers: Vec<_> = world
            .map(|comm| {
                scope.spawn(move || {
                    let no_input = || -> Result<(CsrMatrix<T>, CsrMatrix<T>)> { Err(Error::Aborted) };
                    let outcome = run_worker(&comm, no_input, kernel);
                    (comm.rank(), outcome)
                })
            })
            .collect();

        let outcome = run_worker(&coordinator, load, kernel);
        // Peers still blocked on the coordinator see a transport error
        drop(coordinator);

        let mut panicked = None;
        for (index, handle) in workers.into_iter().enumerate() {
            match handle.join() {
                Ok((rank, Err(err))) => debug!(rank, error = %err, "worker stopped"),
                Ok(_) => {}
                Err(_) => {
                    panicked.get_or_insert(index + 1);
                }
            }
        }

        settle(outcome, panicked)
    })
}

/// Combines the coordinator's outcome with the first worker thread that panicked
///
/// A panicking worker drops its endpoints, so the coordinator only sees a
/// transport error; the panic is reported in its place.
fn settle<T>(outcome: Result<Option<DistributedProduct<T>>>, panicked: Option<usize>) -> Result<DistributedProduct<T>> {
    let worker_panicked = |rank| Error::WorkerFailed {
        rank,
        reason: "worker thread panicked".to_string(),
    };

    match (outcome, panicked) {
        (Err(Error::Transport { .. }), Some(rank)) => Err(worker_panicked(rank)),
        (Err(err), _) => Err(err),
        (Ok(_), Some(rank)) => Err(worker_panicked(rank)),
        (Ok(Some(product)), None) => Ok(product),
        (Ok(None), None) => Err(Error::Protocol {
            rank: COORDINATOR,
            expected: "product",
            got: "nothing",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_panicked_worker_replaces_transport_error() {
        let outcome: Result<Option<DistributedProduct<i64>>> = Err(Error::Transport { rank: 0, peer: 1 });

        match settle(outcome, Some(2)) {
            Err(Error::WorkerFailed { rank, reason }) => {
                assert_eq!(rank, 2);
                assert!(reason.contains("panicked"));
            }
            other => panic!("expected a worker failure, got {:?}", other.map(|p| p.matrix)),
        }
    }

    #[test]
    fn test_coordinator_error_outranks_panic() {
        let outcome: Result<Option<DistributedProduct<i64>>> = Err(Error::Overflow { row: 0, col: 1 });
        assert!(matches!(settle(outcome, Some(1)), Err(Error::Overflow { row: 0, col: 1 })));
    }

    #[test]
    fn test_successful_run_without_panic() {
        let product = DistributedProduct {
            matrix: CsrMatrix::<i64>::identity(2),
            elapsed: Duration::ZERO,
            n_workers: 2,
        };

        let settled = settle(Ok(Some(product)), None).unwrap();
        assert_eq!(settled.matrix, CsrMatrix::identity(2));
        assert!(matches!(settle::<i64>(Ok(None), None), Err(Error::Protocol { .. })));
    }
}
