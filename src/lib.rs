//! # csrmul: distributed sparse matrix multiplication
//!
//! Multiplies two sparse matrices stored in Compressed Sparse Row (CSR)
//! format across a fixed set of workers.
//!
//! ## Overview
//!
//! - **Local kernel**: row-by-row product with a dense (or hash-map) row
//!   accumulator, output sorted by column with no explicit zeros
//! - **Row partitioner**: equal row counts per worker, remainder to the lowest ranks
//! - **Orchestrator**: the coordinator broadcasts both operands, every worker
//!   multiplies its row slice, and the coordinator concatenates the partial
//!   products with corrected row pointers
//!
//! ## Usage
//!
//! ```
//! use csrmul::{distributed_spgemm, local_spgemm, CsrMatrix, DistributedConfig, KernelConfig};
//!
//! // A = [1 2; 0 3], B = I
//! let a = CsrMatrix::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1i64, 2, 3]);
//! let b = CsrMatrix::identity(2);
//!
//! let serial = local_spgemm(&a, &b, &KernelConfig::default()).unwrap();
//! let distributed = distributed_spgemm(&a, &b, &DistributedConfig::with_workers(2)).unwrap();
//!
//! assert_eq!(serial, distributed.matrix);
//! ```

pub mod accumulator;
pub mod distributed;
pub mod error;
pub mod generate;
pub mod matrix;
pub mod multiply;
pub mod parallel;
pub mod partition;
pub mod utils;

// Re-export primary components
pub use distributed::{distributed_spgemm, distributed_spgemm_with, DistributedProduct};
pub use error::{Error, Result};
pub use matrix::{dense_reference_spgemm, reference_spgemm};
pub use matrix::{AccumulatorKind, CsrMatrix, DistributedConfig, Element, KernelConfig};
pub use multiply::local_spgemm;
pub use parallel::local_spgemm_parallel;
pub use partition::{partition, partition_all, RowRange};
pub use utils::{format_csr, parse_csr, read_csr_file, write_csr_file, FormatWarning, ParsedCsr};

/// Version information for the csrmul library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
