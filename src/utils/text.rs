//! Plain-text CSR format
//!
//! A matrix file holds up to three labelled lines of whitespace-separated
//! integers:
//!
//! ```text
//! Values: 1 2 3
//! Column_Indices: 0 1 1
//! Row_Pointers: 0 2 3
//! ```
//!
//! The dimensions are not stored; callers pass them in. Labels may appear in
//! any order, a repeated label appends to the same sequence, and lines with an
//! unknown label are ignored.

use std::fmt::{self, Display};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Error, Result};
use crate::matrix::CsrMatrix;

const VALUES_LABEL: &str = "Values:";
const COL_INDICES_LABEL: &str = "Column_Indices:";
const ROW_POINTERS_LABEL: &str = "Row_Pointers:";

/// Non-fatal inconsistencies found while reading a matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatWarning {
    /// `Row_Pointers` does not hold `rows + 1` entries
    RowPointerCount {
        /// `rows + 1`
        expected: usize,
        /// Number of row pointers read
        found: usize,
    },
    /// `Values` and `Column_Indices` have different lengths
    EntryCountMismatch {
        /// Number of values read
        values: usize,
        /// Number of column indices read
        col_indices: usize,
    },
}

impl Display for FormatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatWarning::RowPointerCount { expected, found } => write!(
                f,
                "size of row_pointers ({}) does not match rows + 1 ({})",
                found, expected
            ),
            FormatWarning::EntryCountMismatch {
                values,
                col_indices,
            } => write!(
                f,
                "{} values but {} column indices",
                values, col_indices
            ),
        }
    }
}

/// A matrix as read from text, with the warnings raised while reading it
#[derive(Debug, Clone)]
pub struct ParsedCsr<T> {
    /// The data exactly as read; not validated
    pub matrix: CsrMatrix<T>,
    /// Non-fatal inconsistencies, already logged
    pub warnings: Vec<FormatWarning>,
}

/// Parses CSR text for a matrix declared as `n_rows × n_cols`
///
/// A missing or empty `Row_Pointers` line and any token that does not parse
/// are fatal. A row pointer count other than `n_rows + 1` is only a warning:
/// the matrix is returned as read and later bounds checks decide whether it
/// can be used.
pub fn parse_csr<T>(text: &str, n_rows: usize, n_cols: usize) -> Result<ParsedCsr<T>>
where
    T: FromStr,
{
    let mut values = Vec::new();
    let mut col_idx = Vec::new();
    let mut row_ptr = Vec::new();
    let mut saw_row_pointers = false;

    for (line_no, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some(VALUES_LABEL) => values.extend(parse_tokens::<T>(tokens, line_no, "value")?),
            Some(COL_INDICES_LABEL) => {
                col_idx.extend(parse_tokens::<usize>(tokens, line_no, "column index")?)
            }
            Some(ROW_POINTERS_LABEL) => {
                saw_row_pointers = true;
                row_ptr.extend(parse_tokens::<usize>(tokens, line_no, "row pointer")?)
            }
            _ => {}
        }
    }

    if !saw_row_pointers {
        return Err(Error::format("missing Row_Pointers line"));
    }
    if row_ptr.is_empty() {
        return Err(Error::format("Row_Pointers line holds no entries"));
    }

    let mut warnings = Vec::new();
    if row_ptr.len() != n_rows + 1 {
        warnings.push(FormatWarning::RowPointerCount {
            expected: n_rows + 1,
            found: row_ptr.len(),
        });
    }
    if values.len() != col_idx.len() {
        warnings.push(FormatWarning::EntryCountMismatch {
            values: values.len(),
            col_indices: col_idx.len(),
        });
    }
    for warning in &warnings {
        warn!(%warning, "inconsistent CSR text");
    }

    Ok(ParsedCsr {
        matrix: CsrMatrix::from_raw_parts(n_rows, n_cols, row_ptr, col_idx, values),
        warnings,
    })
}

fn parse_tokens<'a, U: FromStr>(
    tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
    what: &str,
) -> Result<Vec<U>> {
    tokens
        .map(|token| {
            token.parse::<U>().map_err(|_| {
                Error::format(format!(
                    "line {}: invalid {} '{}'",
                    line_no + 1,
                    what,
                    token
                ))
            })
        })
        .collect()
}

/// Reads a CSR text file for a matrix declared as `n_rows × n_cols`
pub fn read_csr_file<T, P>(path: P, n_rows: usize, n_cols: usize) -> Result<ParsedCsr<T>>
where
    T: FromStr,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_csr(&text, n_rows, n_cols)
}

/// Writes the three labelled lines of `matrix`
pub fn write_csr<T, W>(out: &mut W, matrix: &CsrMatrix<T>) -> io::Result<()>
where
    T: Display,
    W: Write + ?Sized,
{
    write_line(out, VALUES_LABEL, &matrix.values)?;
    write_line(out, COL_INDICES_LABEL, &matrix.col_idx)?;
    write_line(out, ROW_POINTERS_LABEL, &matrix.row_ptr)
}

fn write_line<U: Display, W: Write + ?Sized>(out: &mut W, label: &str, items: &[U]) -> io::Result<()> {
    write!(out, "{}", label)?;
    for item in items {
        write!(out, " {}", item)?;
    }
    writeln!(out)
}

/// Renders `matrix` as CSR text
pub fn format_csr<T: Display>(matrix: &CsrMatrix<T>) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_csr(&mut out, matrix);
    String::from_utf8_lossy(&out).into_owned()
}

/// Writes `matrix` to `path` as CSR text
pub fn write_csr_file<T, P>(path: P, matrix: &CsrMatrix<T>) -> Result<()>
where
    T: Display,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = io::BufWriter::new(fs::File::create(path).map_err(io_error)?);
    write_csr(&mut file, matrix).map_err(io_error)?;
    file.flush().map_err(io_error)
}
