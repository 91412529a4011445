// Matrix data structures and configuration

pub mod config;
pub mod csr;
pub mod element;
pub mod reference;

pub use config::{AccumulatorKind, DistributedConfig, KernelConfig};
pub use csr::CsrMatrix;
pub use element::Element;
pub use reference::{dense_reference_spgemm, reference_spgemm};
