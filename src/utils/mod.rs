//! Utility functions and helpers

pub mod formats;
pub mod text;

pub use formats::{from_sprs_csr, to_sprs_csr};
pub use text::{format_csr, parse_csr, read_csr_file, write_csr, write_csr_file, FormatWarning, ParsedCsr};
