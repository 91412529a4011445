//! Error types for csrmul

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using csrmul's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, multiplying or distributing matrices
///
/// Every variant is fatal for the run that produced it. Non-fatal conditions
/// (such as a row pointer count that disagrees with the declared row count)
/// are reported as [`crate::utils::text::FormatWarning`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A matrix file could not be opened, read or written
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A matrix file was readable but its content is not valid CSR text
    #[error("Malformed CSR text: {reason}")]
    Format {
        /// What was wrong with the input
        reason: String,
    },

    /// A matrix violates its own structural invariants
    ///
    /// Raised before any out-of-bounds access would happen.
    #[error("Structural invariant violated in matrix {matrix}: {reason}")]
    Structure {
        /// Name of the offending operand ("A", "B", "C", ...)
        matrix: &'static str,
        /// Description of the violated bound
        reason: String,
    },

    /// The operands cannot be multiplied
    #[error("Matrix dimensions do not match for multiplication: A has {a_cols} columns, B has {b_rows} rows")]
    DimensionMismatch {
        /// Column count of the left operand
        a_cols: usize,
        /// Row count of the right operand
        b_rows: usize,
    },

    /// Invalid worker count or rank passed to the row partitioner
    #[error("Invalid partition request: rank {rank} of {worker_count} workers")]
    InvalidPartition {
        /// Number of workers
        worker_count: usize,
        /// Requested rank
        rank: usize,
    },

    /// A message arrived that does not fit the current protocol step
    #[error("Protocol violation on rank {rank}: expected {expected}, got {got}")]
    Protocol {
        /// Rank observing the violation
        rank: usize,
        /// Message kind the protocol step expects
        expected: &'static str,
        /// Message kind actually received
        got: &'static str,
    },

    /// An integer product or sum does not fit the element type
    #[error("Arithmetic overflow computing entry ({row}, {col}) of the product")]
    Overflow {
        /// Output row
        row: usize,
        /// Output column
        col: usize,
    },

    /// A generator or run setting is out of range
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Which setting was rejected
        reason: String,
    },

    /// A peer worker disappeared (its endpoint was dropped)
    #[error("Transport failure between rank {rank} and rank {peer}")]
    Transport {
        /// Local rank
        rank: usize,
        /// Remote rank
        peer: usize,
    },

    /// A worker reported a local failure to the coordinator
    #[error("Worker {rank} failed: {reason}")]
    WorkerFailed {
        /// Failing rank
        rank: usize,
        /// Error message reported by that rank
        reason: String,
    },

    /// The coordinator told this worker to stop
    #[error("Run aborted by coordinator")]
    Aborted,
}

impl Error {
    pub(crate) fn structure(matrix: &'static str, reason: impl Into<String>) -> Self {
        Error::Structure {
            matrix,
            reason: reason.into(),
        }
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Error::Format {
            reason: reason.into(),
        }
    }
}
