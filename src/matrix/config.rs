//! Configuration for the local kernel and the distributed run

use std::fmt;
use std::str::FromStr;

/// Default column count up to which `AccumulatorKind::Auto` picks the dense accumulator
pub const DEFAULT_DENSE_THRESHOLD: usize = 1 << 16;

/// Strategy used to accumulate the partial products of one output row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulatorKind {
    /// Dense array of `b.n_cols` slots reused across rows
    #[default]
    Dense,
    /// Hash map keyed by column, cleared per row
    Sparse,
    /// Dense while `b.n_cols <= dense_threshold`, sparse otherwise
    Auto,
}

impl AccumulatorKind {
    /// Resolves `Auto` against the output width
    pub fn resolve(self, n_cols: usize, dense_threshold: usize) -> AccumulatorKind {
        match self {
            AccumulatorKind::Auto if n_cols <= dense_threshold => AccumulatorKind::Dense,
            AccumulatorKind::Auto => AccumulatorKind::Sparse,
            kind => kind,
        }
    }
}

impl fmt::Display for AccumulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccumulatorKind::Dense => "dense",
            AccumulatorKind::Sparse => "sparse",
            AccumulatorKind::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl FromStr for AccumulatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" => Ok(AccumulatorKind::Dense),
            "sparse" | "hash" => Ok(AccumulatorKind::Sparse),
            "auto" => Ok(AccumulatorKind::Auto),
            other => Err(format!("unknown accumulator '{}'", other)),
        }
    }
}

/// Parameters of the local multiply kernel
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Row accumulation strategy
    pub accumulator: AccumulatorKind,

    /// Threshold used when `accumulator` is `Auto`
    pub dense_threshold: usize,

    /// Process the rows of a slice with rayon instead of sequentially
    pub row_parallel: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            accumulator: AccumulatorKind::Dense,
            dense_threshold: DEFAULT_DENSE_THRESHOLD,
            row_parallel: false,
        }
    }
}

impl KernelConfig {
    /// Sets the accumulation strategy
    pub fn with_accumulator(mut self, accumulator: AccumulatorKind) -> Self {
        self.accumulator = accumulator;
        self
    }

    /// Enables or disables rayon row parallelism inside a worker
    pub fn with_row_parallel(mut self, row_parallel: bool) -> Self {
        self.row_parallel = row_parallel;
        self
    }
}

/// Configuration of a distributed multiplication run
#[derive(Debug, Clone)]
pub struct DistributedConfig {
    /// Number of workers, coordinator included
    pub n_workers: usize,

    /// Kernel settings applied on every worker
    pub kernel: KernelConfig,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            n_workers: num_cpus::get(), // One worker per available core
            kernel: KernelConfig::default(),
        }
    }
}

impl DistributedConfig {
    /// Create a config for a fixed number of workers
    pub fn with_workers(n_workers: usize) -> Self {
        Self {
            n_workers,
            kernel: KernelConfig::default(),
        }
    }

    /// Replaces the kernel settings
    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernel = kernel;
        self
    }
}
