//! Random sparse matrix generation
//!
//! Every row gets the same number of distinct columns, `round(cols * density)`,
//! with values drawn uniformly from a small positive range. The random source
//! is passed in, so a seeded generator reproduces the same matrix. The
//! configuration is checked before anything is drawn.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::matrix::CsrMatrix;

/// Fraction of columns populated in every row by default
pub const DEFAULT_DENSITY: f64 = 0.2;

/// Parameters of the random generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Fraction of columns populated per row, in `[0, 1]`
    pub density: f64,
    /// Smallest generated value
    pub min_value: i64,
    /// Largest generated value
    pub max_value: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            min_value: 1,
            max_value: 20,
        }
    }
}

impl GeneratorConfig {
    /// Rejects an empty value range and a density outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.min_value > self.max_value {
            return Err(Error::Config {
                reason: format!(
                    "value range is empty: min_value {} > max_value {}",
                    self.min_value, self.max_value
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(Error::Config {
                reason: format!("density {} is outside [0, 1]", self.density),
            });
        }
        Ok(())
    }

    /// Number of stored entries per row for a matrix with `n_cols` columns
    pub fn nnz_per_row(&self, n_cols: usize) -> usize {
        let density = self.density.clamp(0.0, 1.0);
        ((n_cols as f64 * density).round() as usize).min(n_cols)
    }
}

/// Generates a random `n_rows × n_cols` matrix with sorted, distinct columns per row
///
/// Fails with [`Error::Config`] if `config` does not pass
/// [`GeneratorConfig::validate`].
pub fn generate_csr<R: Rng + ?Sized>(
    n_rows: usize,
    n_cols: usize,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<CsrMatrix<i64>> {
    config.validate()?;
    let per_row = config.nnz_per_row(n_cols);

    let mut row_ptr = Vec::with_capacity(n_rows + 1);
    let mut col_idx = Vec::with_capacity(n_rows * per_row);
    let mut values = Vec::with_capacity(n_rows * per_row);

    row_ptr.push(0);
    for _ in 0..n_rows {
        let mut cols = sample(rng, n_cols, per_row).into_vec();
        cols.sort_unstable();

        for col in cols {
            col_idx.push(col);
            values.push(rng.gen_range(config.min_value..=config.max_value));
        }
        row_ptr.push(col_idx.len());
    }

    Ok(CsrMatrix::from_raw_parts(n_rows, n_cols, row_ptr, col_idx, values))
}

/// Generates a matrix from a fixed seed
pub fn generate_csr_seeded(n_rows: usize, n_cols: usize, config: &GeneratorConfig, seed: u64) -> Result<CsrMatrix<i64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    generate_csr(n_rows, n_cols, config, &mut rng)
}

/// File name used for a generated matrix: `<rows>_<cols>_csr.txt`
pub fn default_file_name(n_rows: usize, n_cols: usize) -> String {
    format!("{}_{}_csr.txt", n_rows, n_cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_matrix_is_valid() {
        let matrix = generate_csr_seeded(30, 10, &GeneratorConfig::default(), 7).unwrap();

        assert!(matrix.validate("generated").is_ok());
        assert_eq!(matrix.nnz(), 30 * 2);
        assert!(matrix.values.iter().all(|&v| (1..=20).contains(&v)));
        for i in 0..matrix.n_rows {
            let cols: Vec<_> = matrix.row_iter(i).map(|(col, _)| col).collect();
            assert!(cols.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_seed_reproducibility() {
        let config = GeneratorConfig::default();
        assert_eq!(
            generate_csr_seeded(8, 8, &config, 42).unwrap(),
            generate_csr_seeded(8, 8, &config, 42).unwrap()
        );
    }

    #[test]
    fn test_nnz_per_row_rounding() {
        let config = GeneratorConfig::default();
        assert_eq!(config.nnz_per_row(10), 2);
        assert_eq!(config.nnz_per_row(13), 3); // 2.6 rounds up
        assert_eq!(config.nnz_per_row(2), 0); // 0.4 rounds down
        assert_eq!(config.nnz_per_row(0), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let inverted = GeneratorConfig {
            min_value: 5,
            max_value: -5,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            generate_csr_seeded(3, 3, &inverted, 0),
            Err(Error::Config { .. })
        ));

        for density in [-0.1, 1.5, f64::NAN] {
            let config = GeneratorConfig {
                density,
                ..GeneratorConfig::default()
            };
            assert!(config.validate().is_err(), "density {}", density);
        }

        let single = GeneratorConfig {
            min_value: 4,
            max_value: 4,
            ..GeneratorConfig::default()
        };
        assert!(single.validate().is_ok());
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(100, 50), "100_50_csr.txt");
    }
}
